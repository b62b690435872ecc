/*!

The failure map consumed by the routing planner.

A `FaultTable` records, for every router, which of its ports are dead, plus a
whole-node flag. It is populated once before the simulation begins, from its own
seeded RNG so that fault placement does not perturb the traffic random stream, and
is immutable afterwards: the planner receives it by shared reference and the
failures persist for the whole run.

*/

use rand::{rngs::StdRng,Rng,SeedableRng};

use quantifiable_derive::Quantifiable;//the derive macro
use crate::config::ConfigurationValue;
use crate::error::Error;
use crate::error;
use crate::matrix::Matrix;
use crate::quantify::Quantifiable;
use crate::topology::{Topology,NeighbourRouterIteratorItem};

///The seed of the fault-placement RNG. Kept separate from the traffic seed so both
///streams stay uncorrelated run-to-run.
#[derive(Clone,Copy,Debug)]
pub enum FailureSeed
{
	///A reproducible seed.
	Fixed(u64),
	///Seed from the wall clock. The resolved seed is reported by stdout.
	WallClock,
}

impl FailureSeed
{
	///Reads a `fail_seed` configuration entry: either an integer or the literal `"time"`.
	pub fn from_config(cv:&ConfigurationValue) -> Result<FailureSeed,Error>
	{
		match cv
		{
			&ConfigurationValue::Number(_) => Ok(FailureSeed::Fixed(cv.as_u64()?)),
			&ConfigurationValue::Literal(ref s) if s=="time" => Ok(FailureSeed::WallClock),
			_ => Err(error!(ill_formed_configuration,cv.clone()).with_message("fail_seed must be an integer or \"time\"".to_string())),
		}
	}
	fn build_rng(self) -> StdRng
	{
		let seed = match self
		{
			FailureSeed::Fixed(seed) => seed,
			FailureSeed::WallClock =>
			{
				let seed = chrono::Utc::now().timestamp() as u64;
				println!("SEED: fail_seed={}",seed);
				seed
			},
		};
		StdRng::seed_from_u64(seed)
	}
}

///The per-router, per-port failure map.
#[derive(Debug,Quantifiable)]
pub struct FaultTable
{
	///`dead_ports[router][port]`, with the CPU port at column 0.
	dead_ports: Matrix<bool>,
	///Whole-router failures.
	dead_nodes: Vec<bool>,
}

impl FaultTable
{
	///A table with every router and port alive.
	pub fn healthy(topology:&dyn Topology) -> FaultTable
	{
		let n = topology.num_routers();
		let max_ports = (0..n).map(|router|topology.ports(router)).max().unwrap_or(0);
		FaultTable::healthy_sized(n,max_ports)
	}
	///A clean table of explicit dimensions, for when the topology is still being built.
	pub fn healthy_sized(num_routers:usize, ports_per_router:usize) -> FaultTable
	{
		FaultTable{
			dead_ports: Matrix::constant(false,num_routers,ports_per_router),
			dead_nodes: vec![false;num_routers],
		}
	}
	/**
	Builds the table by taking down `amount` uniformly random routers. The same
	`(amount,seed)` pair always produces the same table. A router may be drawn twice,
	in which case fewer distinct routers fail, as in the original fault model.
	**/
	pub fn random_node_failures(topology:&dyn Topology, amount:usize, seed:FailureSeed) -> FaultTable
	{
		let mut rng = seed.build_rng();
		let mut table = FaultTable::healthy(topology);
		let n = topology.num_routers();
		for _ in 0..amount
		{
			let failed = rng.gen_range(0..n);
			table.kill_node(topology,failed);
		}
		table
	}
	/**
	Marks a router as down: every one of its ports becomes dead and, on each live
	neighbour, the peer port facing it becomes dead as well. Updates commute, so the
	order in which routers are killed is irrelevant.
	**/
	pub fn kill_node(&mut self, topology:&dyn Topology, router:usize)
	{
		self.dead_nodes[router] = true;
		for port in 0..topology.ports(router)
		{
			*self.dead_ports.get_mut(router,port) = true;
		}
		for NeighbourRouterIteratorItem{neighbour_router,neighbour_port,..} in topology.neighbour_router_iter(router)
		{
			*self.dead_ports.get_mut(neighbour_router,neighbour_port) = true;
		}
	}
	///Marks a single directed port as dead, leaving the rest of the router alive.
	pub fn kill_port(&mut self, router:usize, port:usize)
	{
		*self.dead_ports.get_mut(router,port) = true;
	}
	pub fn is_dead(&self, router:usize, port:usize) -> bool
	{
		*self.dead_ports.get(router,port)
	}
	pub fn is_node_dead(&self, router:usize) -> bool
	{
		self.dead_nodes[router]
	}
	///The number of routers marked down.
	pub fn amount_dead_nodes(&self) -> usize
	{
		self.dead_nodes.iter().filter(|&&dead|dead).count()
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::topology::{new_topology,TopologyBuilderArgument};
	use crate::Plugs;

	fn build_7x3() -> Box<dyn Topology>
	{
		let cv = ConfigurationValue::Object("PolarFlyPlus".to_string(),vec![
			("k".to_string(),ConfigurationValue::Number(2.0)),
			("n".to_string(),ConfigurationValue::Number(3.0)),
		]);
		let plugs = Plugs::default();
		let mut rng = StdRng::seed_from_u64(1);
		new_topology(TopologyBuilderArgument{cv:&cv,plugs:&plugs,rng:&mut rng})
	}

	#[test]
	fn node_down_kills_ports_and_peers()
	{
		let topology = build_7x3();
		let mut table = FaultTable::healthy(&*topology);
		let victim = 5;
		table.kill_node(&*topology,victim);
		assert!( table.is_node_dead(victim) );
		for port in 0..topology.ports(victim)
		{
			assert!( table.is_dead(victim,port), "port {} of the dead router should be dead",port );
		}
		for item in topology.neighbour_router_iter(victim)
		{
			assert!( table.is_dead(item.neighbour_router,item.neighbour_port),
				"peer port {} of router {} faces the dead router and should be dead",item.neighbour_port,item.neighbour_router );
			if item.neighbour_router==victim
			{
				// a red-group self-loop port looks back at the victim itself
				continue;
			}
			assert!( !table.is_node_dead(item.neighbour_router) );
			// the CPU port of a live neighbour stays alive
			assert!( !table.is_dead(item.neighbour_router,0) );
		}
	}

	#[test]
	fn injection_is_reproducible()
	{
		let topology = build_7x3();
		let first = FaultTable::random_node_failures(&*topology,3,FailureSeed::Fixed(42));
		let second = FaultTable::random_node_failures(&*topology,3,FailureSeed::Fixed(42));
		for router in 0..topology.num_routers()
		{
			assert_eq!( first.is_node_dead(router), second.is_node_dead(router) );
			for port in 0..topology.ports(router)
			{
				assert_eq!( first.is_dead(router,port), second.is_dead(router,port) );
			}
		}
		assert!( first.amount_dead_nodes()>=1 && first.amount_dead_nodes()<=3 );
	}

	#[test]
	fn healthy_table_is_clean()
	{
		let topology = build_7x3();
		let table = FaultTable::healthy(&*topology);
		for router in 0..topology.num_routers()
		{
			assert!( !table.is_node_dead(router) );
			for port in 0..topology.ports(router)
			{
				assert!( !table.is_dead(router,port) );
			}
		}
	}
}
