
/*!

A Routing defines the ways to select a next router to eventually reach the destination.

In this crate the route is decided entirely at the source: the planner runs once at
injection and stores the resulting [PolarPath] in the packet's [RoutingInfo]; every
router along the way asks `Routing::next` for the single planned egress.

see [`new_routing`](fn.new_routing.html) for documentation on the configuration syntax.

*/

///Contains the source-routing planner and the per-hop forwarder of PolarFly+.
pub mod polarflyplus;

use std::cell::RefCell;
use std::fmt::Debug;

use ::rand::{rngs::StdRng};

use quantifiable_derive::Quantifiable;//the derive macro
use crate::config::ConfigurationValue;
use crate::quantify::Quantifiable;
use crate::topology::Topology;
use crate::{Plugs,Time};
pub use crate::error::Error;

pub use self::polarflyplus::{PolarFlyPlusSource,PolarPath,PlannedRoute,RouteQuality};

pub mod prelude
{
	pub use super::{new_routing,Routing,RoutingInfo,RoutingNextCandidates,CandidateEgress,RoutingBuilderArgument,PacketClass,Error};
}

/**
The class of a packet, as set by the protocol engine of its source NIC. Requests
and replies travel on disjoint virtual-channel halves so that a reply can never
block the request traffic that produces it.
**/
#[derive(Clone,Copy,Debug,Eq,Hash,PartialEq)]
pub enum PacketClass
{
	ReadRequest,
	WriteRequest,
	ReadReply,
	WriteReply,
}

impl PacketClass
{
	pub fn is_reply(self) -> bool
	{
		match self
		{
			PacketClass::ReadReply | PacketClass::WriteReply => true,
			_ => false,
		}
	}
	///The first virtual channel of the half this class travels on, with `vcs_per_class`
	///channels per half.
	pub fn base_virtual_channel(self, vcs_per_class:usize) -> usize
	{
		if self.is_reply() { vcs_per_class } else { 0 }
	}
	pub fn all() -> [PacketClass;4]
	{
		[PacketClass::ReadRequest,PacketClass::WriteRequest,PacketClass::ReadReply,PacketClass::WriteReply]
	}
}

impl Quantifiable for PacketClass
{
	fn total_memory(&self) -> usize
	{
		std::mem::size_of::<PacketClass>()
	}
	fn print_memory_breakdown(&self)
	{
		unimplemented!();
	}
	fn forecast_total_memory(&self) -> usize
	{
		std::mem::size_of::<PacketClass>()
	}
}

///Information stored in the packet for the `Routing` algorithms to operate.
#[derive(Quantifiable)]
#[derive(Debug)]
pub struct RoutingInfo
{
	///Number of edges traversed (Router--Router). It is computed by the advance routine of the simulator.
	pub hops: usize,

	//All the remaining fields are used and computed by the Routing employed.
	///The route planned at injection, carried with the packet until ejection.
	pub planned_route: Option<PlannedRoute>,
	///Port by which the packet entered its current router. 0 while still at the source NIC.
	pub entry_port: usize,
	///Virtual channel the packet occupies on its inbound link.
	pub entry_virtual_channel: usize,
	///Source server index, optional.
	pub source_server: Option<usize>,
}

impl RoutingInfo
{
	pub fn new() -> RoutingInfo
	{
		RoutingInfo{
			hops: 0,
			planned_route: None,
			entry_port: 0,
			entry_virtual_channel: 0,
			source_server: None,
		}
	}
}

///Represent a port plus additional information that a routing algorithm can determine on how a packet must advance to the next router or server.
#[derive(Clone)]
#[derive(Debug,Default)]
pub struct CandidateEgress
{
	///Candidate exit port
	pub port: usize,
	///Candidate virtual channel in which being inserted.
	pub virtual_channel: usize,
	///Value used to indicate priorities. Semantics defined per routing and policy. Routing should use low values for more priority.
	pub label: i32,
	///An estimation of the number of hops pending. This include the hop we are requesting.
	pub estimated_remaining_hops: Option<usize>,

	///The routing must set this to None.
	///The `Router` can set it to `Some(true)` when it satisfies all flow-control criteria and to `Some(false)` when it fails any criterion.
	pub router_allows: Option<bool>,
}

impl CandidateEgress
{
	pub fn new(port:usize, virtual_channel:usize)->CandidateEgress
	{
		CandidateEgress{
			port,
			virtual_channel,
			label: 0,
			estimated_remaining_hops: None,
			router_allows: None,
		}
	}
}

///The candidates as provided by the routing together with related information.
///This is, the return type of `Routing::next`.
#[derive(Clone,Debug,Default)]
pub struct RoutingNextCandidates
{
	///The vector of candidates.
	pub candidates: Vec<CandidateEgress>,
	///Whether sucessive calls to the routing algorithm will find the exact same set of candidates.
	///Source-planned routings always answer true, which lets the router skip repeated calls.
	pub idempotent: bool,
}

impl From<RoutingNextCandidates> for Vec<CandidateEgress>
{
	fn from(candidates: RoutingNextCandidates) -> Self
	{
		candidates.candidates
	}
}

impl IntoIterator for RoutingNextCandidates
{
	type Item = CandidateEgress;
	type IntoIter = <Vec<CandidateEgress> as IntoIterator>::IntoIter;
	fn into_iter(self) -> <Self as IntoIterator>::IntoIter
	{
		self.candidates.into_iter()
	}
}

impl RoutingNextCandidates
{
	pub fn len(&self)->usize
	{
		self.candidates.len()
	}
}

/**
A routing algorithm to provide candidate routes when the `Router` requires.
It may store/use information in the RoutingInfo.
A `Routing` does not receive information about the state of buffers or similar; the
router microarchitecture owns allocation and simply stalls on exhausted credits.
**/
pub trait Routing : Debug
{
	/// Compute the list of allowed exits.
	/// `routing_info` contains the information in the packet being routed.
	/// `current_router` is the index of the router in the `topology` that is performing the routing.
	/// `target_router` is the index of the router towards which we are routing.
	/// If `target_server` is not None it is the server destination of the packet, which must be attached to `target_router`.
	/// `class` is the packet class set at its source NIC.
	/// `num_virtual_channels` is the number of virtual channels dedicated to this routing.
	/// `rng` is the global generator of random numbers.
	fn next(&self, routing_info:&RoutingInfo, topology:&dyn Topology, current_router:usize, target_router:usize, target_server:Option<usize>, class:PacketClass, num_virtual_channels:usize, rng: &mut StdRng) -> Result<RoutingNextCandidates,Error>;
	///Initialize the routing info of the packet. Called when the first phit of the packet leaves the server and enters a router.
	fn initialize_routing_info(&self, _routing_info:&RefCell<RoutingInfo>, _topology:&dyn Topology, _current_router:usize, _target_router:usize, _target_server:Option<usize>, _class:PacketClass, _rng: &mut StdRng) {}
	///Updates the routing info of the packet. Called when the first phit of the packet leaves a router and enters another router. Values are of the router being entered into.
	fn update_routing_info(&self, _routing_info:&RefCell<RoutingInfo>, _topology:&dyn Topology, _current_router:usize, _current_port:usize, _target_router:usize, _target_server:Option<usize>, _rng: &mut StdRng) {}
	///Prepares the routing to be utilized. Perhaps by precomputing routing tables.
	fn initialize(&mut self, _topology:&dyn Topology, _rng: &mut StdRng) {}
	///To be called by the router when one of the candidates is requested.
	fn performed_request(&self, _requested:&CandidateEgress, _routing_info:&RefCell<RoutingInfo>, _topology:&dyn Topology, _current_router:usize, _target_router:usize, _target_server:Option<usize>, _num_virtual_channels:usize, _rng:&mut StdRng) {}
	///To optionally write routing statistics into the simulation output.
	fn statistics(&self,_cycle:Time) -> Option<ConfigurationValue>{ None }
	///Clears all collected statistics
	fn reset_statistics(&mut self,_next_cycle:Time) {}
}

///The argument of a builder function for `Routings`.
#[derive(Debug)]
pub struct RoutingBuilderArgument<'a>
{
	///A ConfigurationValue::Object defining the routing.
	pub cv: &'a ConfigurationValue,
	///The user defined plugs. In case the routing needs to create elements.
	pub plugs: &'a Plugs,
}

/**Build a new routing.

## PolarFly+ source routing

The planner of the PolarFly+ core. At injection it enumerates the splits of the
hypercube move mask around up to two global hops, discards the splits crossing a
dead port, and stores the best surviving path in the packet; each router then
forwards along the stored path while walking the per-phase virtual channels.

```ignore
PolarFlyPlusSource{
	/// Total virtual channels, request plus reply halves. Defaults to 6.
	num_vcs: 6,
	/// Print the planner and forwarder decision lines by stdout. Defaults to false.
	verbose: false,
}
```

*/
pub fn new_routing(arg: RoutingBuilderArgument) -> Box<dyn Routing>
{
	if let &ConfigurationValue::Object(ref cv_name, ref _cv_pairs)=arg.cv
	{
		if let Some(builder) = arg.plugs.routings.get(cv_name)
		{
			return builder(arg);
		}
		match cv_name.as_ref()
		{
			"PolarFlyPlusSource" => Box::new(PolarFlyPlusSource::new(arg)),
			_ => panic!("Unknown Routing {}",cv_name),
		}
	}
	else
	{
		panic!("Trying to create a Routing from a non-Object");
	}
}
