/*!
polarflyplus-lib
=====

This crate provides the routing core of a cycle-level simulator for PolarFly+
hybrid interconnection networks. A PolarFly+ network composes a local hypercube
inside each group with a global PolarFly graph across groups: every router keeps
its NIC at port 0, its hypercube neighbours at ports `1..=k`, and its global links
at ports `k+1..=k+n`, with global links preserving the hypercube coordinate.

The core consists of

* the [topology](topology) construction, which derives router, server and channel
  counts from the configured hypercube dimension and one of the four built-in
  PolarFly connection tables, and assigns the per-channel latencies;
* the [fault table](fault), a per-router per-port failure map populated by its own
  seeded RNG before the simulation starts;
* the source-routing planner and the per-hop forwarder in
  [routing::polarflyplus], which compute at injection a complete path of up to
  three hypercube phases around up to two global hops, and replay it hop by hop
  under the per-phase virtual-channel partition.

The flit-level router microarchitecture, the traffic generation and the global
clocking belong to the embedding simulator; this crate exposes the narrow
contracts those collaborators use, in particular the [Routing](routing::Routing)
trait driven from the routers and the channel list with its latencies.

# Usage

This crate is `polarflyplus-lib`. To use it add `polarflyplus-lib` to your
dependencies in your project's `Cargo.toml`.

```toml
[dependencies]
polarflyplus-lib = "0.3"
```

# Configuration Syntax

Components are built from [ConfigurationValue](config::ConfigurationValue) trees.
Written as text, the pieces this crate consumes look as follows.

```ignore
Configuration
{
	topology: PolarFlyPlus
	{
		k: 2,//hypercube ports per router, 2^k routers per group
		n: 3,//PolarFly ports per router, selects the 7x3 table
		link_failures: 2,//routers to mark down, defaults to 0
		fail_seed: 42,//or "time"
	},
	routing: PolarFlyPlusSource
	{
		num_vcs: 6,//request and reply halves of three phase channels each
	},
}
```

The parsing of configuration files into these values is done by the embedding
simulator; the builders of this crate receive the already-parsed values.

# Plugging

The builder functions [new_topology](topology::new_topology) and
[new_routing](routing::new_routing) receive a [Plugs] argument that may be used to
provide the simulator with additional implementations without modifying this
crate.

*/

pub use quantifiable_derive::Quantifiable;//the derive macro

pub mod config;
pub mod error;
pub mod quantify;
pub mod matrix;
pub mod fault;
pub mod topology;
pub mod routing;

use std::collections::BTreeMap;
use std::fmt::{self,Debug,Formatter};

use crate::topology::{Topology,TopologyBuilderArgument};
use crate::routing::{Routing,RoutingBuilderArgument};

///Simulation time, in the time-units of the channel latencies.
pub type Time = u64;

///User-provided builders, to extend the repertoire of topologies and routings
///known to the builder functions.
pub struct Plugs
{
	pub topologies: BTreeMap<String, Box<dyn Fn(TopologyBuilderArgument) -> Box<dyn Topology>>>,
	pub routings: BTreeMap<String, Box<dyn Fn(RoutingBuilderArgument) -> Box<dyn Routing>>>,
}

impl Plugs
{
	pub fn add_topology(&mut self, key:String, builder:Box<dyn Fn(TopologyBuilderArgument) -> Box<dyn Topology>>)
	{
		self.topologies.insert(key,builder);
	}
	pub fn add_routing(&mut self, key:String, builder:Box<dyn Fn(RoutingBuilderArgument) -> Box<dyn Routing>>)
	{
		self.routings.insert(key,builder);
	}
}

impl Default for Plugs
{
	fn default() -> Plugs
	{
		Plugs{
			topologies: BTreeMap::new(),
			routings: BTreeMap::new(),
		}
	}
}

impl Debug for Plugs
{
	fn fmt(&self, f:&mut Formatter) -> fmt::Result
	{
		write!(f,"Plugs{{topologies:[{}],routings:[{}]}}",
			self.topologies.keys().map(|key|key.to_string()).collect::<Vec<String>>().join(","),
			self.routings.keys().map(|key|key.to_string()).collect::<Vec<String>>().join(","))
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use rand::rngs::StdRng;
	use rand::SeedableRng;
	use crate::config::ConfigurationValue;
	use crate::topology::new_topology;

	#[test]
	fn builders_compose()
	{
		let plugs = Plugs::default();
		let mut rng = StdRng::seed_from_u64(0);
		let topology_cv = ConfigurationValue::Object("PolarFlyPlus".to_string(),vec![
			("k".to_string(),ConfigurationValue::Number(2.0)),
			("n".to_string(),ConfigurationValue::Number(3.0)),
		]);
		let topology = new_topology(TopologyBuilderArgument{cv:&topology_cv,plugs:&plugs,rng:&mut rng});
		let routing_cv = ConfigurationValue::Object("PolarFlyPlusSource".to_string(),vec![]);
		let mut routing = routing::new_routing(RoutingBuilderArgument{cv:&routing_cv,plugs:&plugs});
		routing.initialize(&*topology,&mut rng);
		assert_eq!( topology.num_routers(), 28 );
	}
}
