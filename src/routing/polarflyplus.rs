
/*!

The source-routing core of PolarFly+.

A route crosses up to three hypercube phases separated by up to two global hops,

```ignore
src --[hm1 local moves]-- a --[g1 global]-- b --[hm2 local moves]-- c --[g2 global]-- d --[hm3 local moves]-- dst
```

encoded as the five-word [PolarPath]. The planner enumerates the splits
`(hm1,hm2,hm3)` of the total move mask at injection, discarding any split that
crosses a dead port, and the winning path travels inside the packet. Each router
then runs the forwarder, a pure map from the inbound `(port, virtual channel)` and
the stored path to the outbound pair.

Within a phase the hypercube dimensions are consumed in a canonical order, and each
phase owns one virtual channel of its class half. Reversing the order between
consecutive phases together with the strictly ascending channel walk breaks the
turn cycles of the hypercube, which is the whole deadlock-avoidance argument of the
scheme.

*/

use std::cell::RefCell;
use std::cmp::Reverse;

use ::rand::{rngs::StdRng};
use itertools::iproduct;

use quantifiable_derive::Quantifiable;//the derive macro
use crate::config::ConfigurationValue;
use crate::error::Error;
use crate::error;
use crate::fault::FaultTable;
use crate::match_object_panic;
use crate::matrix::Matrix;
use crate::quantify::Quantifiable;
use crate::routing::{RoutingBuilderArgument,RoutingInfo,CandidateEgress,RoutingNextCandidates,Routing,PacketClass};
use crate::topology::Topology;
use crate::topology::polarflyplus::PolarFlyPlusData;
use crate::Time;

/**
The path header carried in the packet payload: three hypercube-move bitmasks, one
per phase, and the two global ports. Global ports are router-relative, in
`[H+1, H+P]`, with 0 meaning the hop is absent.

The five words are plain `i32` laid out consecutively, so the header can be viewed
as raw payload bytes with `as_payload`/`from_payload`.
**/
#[repr(C)]
#[derive(Clone,Copy,Debug,Default,Eq,PartialEq,Quantifiable)]
pub struct PolarPath
{
	pub hm1: i32,
	pub hm2: i32,
	pub hm3: i32,
	pub g1: i32,
	pub g2: i32,
}

unsafe impl bytemuck::Zeroable for PolarPath {}
unsafe impl bytemuck::Pod for PolarPath {}

impl PolarPath
{
	///The hypercube moves of a phase.
	pub fn mask_of_phase(&self, phase:usize) -> usize
	{
		(match phase
		{
			0 => self.hm1,
			1 => self.hm2,
			2 => self.hm3,
			_ => panic!("phase {} out of range",phase),
		}) as usize
	}
	///The global port closing a phase: `g1` after the first phase, `g2` after the
	///second, none after the last.
	pub fn global_of_phase(&self, phase:usize) -> usize
	{
		(match phase
		{
			0 => self.g1,
			1 => self.g2,
			_ => 0,
		}) as usize
	}
	///Amount of hypercube hops encoded.
	pub fn local_hops(&self) -> usize
	{
		(self.hm1.count_ones() + self.hm2.count_ones() + self.hm3.count_ones()) as usize
	}
	///Amount of global hops encoded.
	pub fn global_hops(&self) -> usize
	{
		(if self.g1!=0 {1} else {0}) + (if self.g2!=0 {1} else {0})
	}
	pub fn total_hops(&self) -> usize
	{
		self.local_hops() + self.global_hops()
	}
	///View the header as the payload bytes of the packet.
	pub fn as_payload(&self) -> &[u8]
	{
		bytemuck::bytes_of(self)
	}
	///Recover the header from the head of a packet payload.
	pub fn from_payload(payload:&[u8]) -> PolarPath
	{
		bytemuck::pod_read_unaligned(&payload[..std::mem::size_of::<PolarPath>()])
	}
}

///How good the planned route is.
#[derive(Clone,Copy,Debug,Eq,PartialEq,Quantifiable)]
pub enum RouteQuality
{
	///As short as the fault-free topology permits.
	Minimal,
	///Longer than the shortest possible, because faults forced a detour.
	NonMinimal,
	///No route was found; the path is all zeroes and the packet should be dropped.
	Unroutable,
}

///The outcome of planning a route, stored in the packet at injection.
#[derive(Clone,Copy,Debug,Quantifiable)]
pub struct PlannedRoute
{
	pub path: PolarPath,
	pub quality: RouteQuality,
	///Hops beyond the fault-free shortest, counting the two globals of an escape.
	pub extra_hops: usize,
}

impl PlannedRoute
{
	pub fn is_routable(&self) -> bool
	{
		!matches!(self.quality,RouteQuality::Unroutable)
	}
	/**
	The summary line of a planner decision. One line per planned packet; stable
	text interface.
	**/
	pub fn summary_line(&self, source:usize, destination:usize, move_mask:usize) -> String
	{
		format!("src:{} dest:{} mv:{} localmv1:{} localmv2:{} localmv3:{} global1:{} global2:{} routing:{} extrahops:{} {}",
			source,
			destination,
			move_mask,
			self.path.hm1,
			self.path.hm2,
			self.path.hm3,
			self.path.g1,
			self.path.g2,
			if self.is_routable() {"OK"} else {"NG"},
			self.extra_hops,
			if matches!(self.quality,RouteQuality::Minimal) {"minimal"} else {"non-minimal"},
		)
	}
}

///The per-hop line of a forwarder decision. Stable text interface.
pub fn forwarding_line(router:usize, entry_port:usize, entry_virtual_channel:usize, exit_port:usize, exit_virtual_channel:usize) -> String
{
	format!("router:{} in_port:{} in_vc:{} out_port:{} out_vc:{}",router,entry_port,entry_virtual_channel,exit_port,exit_virtual_channel)
}

///An accepted candidate of the enumeration, before the winner is chosen.
#[derive(Clone,Copy,Debug)]
struct RouteCandidate
{
	///Hypercube hops.
	weight: usize,
	///Global hops.
	globals: usize,
	path: PolarPath,
}

impl RouteCandidate
{
	///Lexicographic selection key: fewest local hops first, then prefer pushing work
	///into the earlier phases, so the first global hop departs from a coordinate as
	///close to the destination as possible.
	fn key(&self) -> (usize,Reverse<i32>,Reverse<i32>,Reverse<i32>)
	{
		(self.weight,Reverse(self.path.hm1),Reverse(self.path.hm2),Reverse(self.path.hm3))
	}
}

/**
The source-planned routing of PolarFly+. See the module documentation for the path
model. The planner runs once per packet at injection; the per-hop forwarder never
consults the fault table, the planner already did.

Example configuration:
```ignore
PolarFlyPlusSource{
	/// Total virtual channels, request plus reply halves. Defaults to 6.
	num_vcs: 6,
	/// Print the planner and forwarder decision lines by stdout. Defaults to false.
	verbose: false,
}
```
**/
#[derive(Debug)]
pub struct PolarFlyPlusSource
{
	///Total virtual channels, request plus reply halves.
	num_vcs: usize,
	///Whether to print the decision lines by stdout.
	verbose: bool,
	///`orders[vc][position]` = hypercube dimension to consume at `position` while on
	///channel `vc`. Built at `initialize` from the topology dimension.
	orders: Matrix<usize>,
	///Packets for which no route was found.
	unroutable_count: RefCell<u64>,
	///Planned routes that were longer than the fault-free shortest.
	nonminimal_count: RefCell<u64>,
}

///The per-phase canonical orders: requests ascend, descend, ascend over the
///dimensions; replies descend, ascend, descend. One row per virtual channel.
fn build_order_table(hypercube_ports:usize, vcs_per_class:usize) -> Matrix<usize>
{
	Matrix::with_capacity_and_function(2*vcs_per_class,hypercube_ports,|row,position|{
		let phase = row % vcs_per_class;
		let reply = row >= vcs_per_class;
		let ascending = (phase%2==0) ^ reply;
		if ascending { position } else { hypercube_ports-1-position }
	})
}

impl PolarFlyPlusSource
{
	pub fn new(arg: RoutingBuilderArgument) -> PolarFlyPlusSource
	{
		let mut num_vcs=6;
		let mut verbose=false;
		match_object_panic!(arg.cv,"PolarFlyPlusSource",value,
			"num_vcs" => num_vcs=value.as_usize().expect("bad value for num_vcs"),
			"verbose" => verbose=value.as_bool().expect("bad value for verbose"),
		);
		assert!(num_vcs>=6 && num_vcs%2==0, "num_vcs must have a channel per phase in each of the request and reply halves");
		PolarFlyPlusSource{
			num_vcs,
			verbose,
			orders: Matrix::constant(0,0,0),
			unroutable_count: RefCell::new(0),
			nonminimal_count: RefCell::new(0),
		}
	}
	fn vcs_per_class(&self) -> usize
	{
		self.num_vcs/2
	}
	///The order row of a phase of a class, which is also its virtual channel.
	fn order_row(&self, class:PacketClass, phase:usize) -> usize
	{
		class.base_virtual_channel(self.vcs_per_class()) + phase
	}
	/**
	Walk the hypercube moves of one phase from `current`, consuming the set bits of
	`mask` in the canonical order of `order_row`. Returns the reached router, or
	`None` at the first dead port.
	**/
	fn walk_phase(&self, data:&PolarFlyPlusData, faults:&FaultTable, mut current:usize, mask:usize, order_row:usize) -> Option<usize>
	{
		for position in 0..data.hypercube_ports()
		{
			let dimension = *self.orders.get(order_row,position);
			if mask & (1<<dimension) != 0
			{
				let port = data.hypercube_port(dimension);
				if faults.is_dead(current,port)
				{
					return None;
				}
				current ^= 1<<dimension;
			}
		}
		Some(current)
	}
	/**
	Simulate one `(hm1,hm2,hm3)` split of the main enumeration: local moves of the
	first phase, a global hop towards the destination group whenever not yet there,
	and so on. Accepts only on exact arrival.
	**/
	fn try_candidate(&self, data:&PolarFlyPlusData, faults:&FaultTable, source:usize, destination:usize, class:PacketClass, hm1:usize, hm2:usize, hm3:usize) -> Option<RouteCandidate>
	{
		let destination_group = data.group_of(destination);
		let masks = [hm1,hm2,hm3];
		let mut globals = [0usize;2];
		let mut current = source;
		for phase in 0..3
		{
			current = self.walk_phase(data,faults,current,masks[phase],self.order_row(class,phase))?;
			if phase<2 && data.group_of(current)!=destination_group
			{
				let port = data.global_port(data.group_of(current),destination_group);
				if faults.is_dead(current,port)
				{
					return None;
				}
				globals[phase] = port;
				let peer_group = data.connection().peer(data.group_of(current),data.global_port_index(port));
				current = data.pack(peer_group,data.coordinate_of(current));
			}
		}
		if current!=destination
		{
			return None;
		}
		Some(RouteCandidate{
			weight: (hm1.count_ones()+hm2.count_ones()+hm3.count_ones()) as usize,
			globals: globals.iter().filter(|&&g|g!=0).count(),
			path: PolarPath{
				hm1: hm1 as i32,
				hm2: hm2 as i32,
				hm3: hm3 as i32,
				g1: globals[0] as i32,
				g2: globals[1] as i32,
			},
		})
	}
	/**
	Simulate one split of the escape enumeration: out to the escape group through
	table entry `escape_index`, the middle phase inside the escape group, and back
	into the home group for the last phase.
	**/
	fn try_escape_candidate(&self, data:&PolarFlyPlusData, faults:&FaultTable, source:usize, destination:usize, class:PacketClass, hm1:usize, hm2:usize, hm3:usize, escape_index:usize) -> Option<RouteCandidate>
	{
		let home_group = data.group_of(source);
		let escape_group = data.connection().peer(home_group,escape_index);
		let exit_port = data.hypercube_ports()+1+escape_index;
		let mut current = self.walk_phase(data,faults,source,hm1,self.order_row(class,0))?;
		if faults.is_dead(current,exit_port)
		{
			return None;
		}
		current = data.pack(escape_group,data.coordinate_of(current));
		current = self.walk_phase(data,faults,current,hm2,self.order_row(class,1))?;
		let return_port = data.global_port(escape_group,home_group);
		if faults.is_dead(current,return_port)
		{
			return None;
		}
		current = data.pack(home_group,data.coordinate_of(current));
		current = self.walk_phase(data,faults,current,hm3,self.order_row(class,2))?;
		if current!=destination
		{
			return None;
		}
		Some(RouteCandidate{
			weight: (hm1.count_ones()+hm2.count_ones()+hm3.count_ones()) as usize,
			globals: 2,
			path: PolarPath{
				hm1: hm1 as i32,
				hm2: hm2 as i32,
				hm3: hm3 as i32,
				g1: exit_port as i32,
				g2: return_port as i32,
			},
		})
	}
	/**
	Plan a complete route from `source` to `destination` under the given failure map.

	All `(hm2,hm3)` pairs are enumerated with `hm1` the completing mask, so splits
	flipping bits outside the move mask are included: such bits appear twice across
	the phases and cancel, giving the overshoot-and-return detours that survive port
	faults. The winner takes the fewest local hops and, among those, the largest
	`hm1`, then `hm2`, then `hm3`.

	When nothing survives and both endpoints share a group, a second enumeration
	tries every escape group: one global hop out, one back, and the three local
	phases around them, which costs the two extra hops over the direct plans.
	**/
	pub fn plan_route(&self, data:&PolarFlyPlusData, faults:&FaultTable, source:usize, destination:usize, class:PacketClass) -> PlannedRoute
	{
		let move_mask = data.coordinate_of(source) ^ data.coordinate_of(destination);
		let baseline = (move_mask.count_ones() as usize) + data.expected_global_hops(source,destination);
		let mut best : Option<RouteCandidate> = None;
		if !faults.is_node_dead(source) && !faults.is_node_dead(destination)
		{
			let group_size = data.group_size();
			for (hm2,hm3) in iproduct!(0..group_size,0..group_size)
			{
				let hm1 = move_mask ^ hm2 ^ hm3;
				if let Some(candidate) = self.try_candidate(data,faults,source,destination,class,hm1,hm2,hm3)
				{
					if best.as_ref().map_or(true,|b|candidate.key()<b.key())
					{
						best = Some(candidate);
					}
				}
			}
			let home_group = data.group_of(source);
			if best.is_none() && home_group==data.group_of(destination)
			{
				for escape_index in 0..data.polarfly_ports()
				{
					if data.connection().is_self_loop(home_group,escape_index)
					{
						continue;
					}
					for (hm2,hm3) in iproduct!(0..group_size,0..group_size)
					{
						let hm1 = move_mask ^ hm2 ^ hm3;
						if let Some(candidate) = self.try_escape_candidate(data,faults,source,destination,class,hm1,hm2,hm3,escape_index)
						{
							if best.as_ref().map_or(true,|b|candidate.key()<b.key())
							{
								best = Some(candidate);
							}
						}
					}
				}
			}
		}
		match best
		{
			Some(candidate) =>
			{
				let extra_hops = candidate.weight + candidate.globals - baseline;
				let quality = if extra_hops==0 { RouteQuality::Minimal } else { RouteQuality::NonMinimal };
				if extra_hops>0
				{
					*self.nonminimal_count.borrow_mut() += 1;
				}
				PlannedRoute{ path:candidate.path, quality, extra_hops }
			},
			None =>
			{
				*self.unroutable_count.borrow_mut() += 1;
				PlannedRoute{ path:PolarPath::default(), quality:RouteQuality::Unroutable, extra_hops:0 }
			},
		}
	}
	/**
	One forwarder decision: map the inbound `(port, virtual channel)` and the stored
	path to the outbound pair at `current_router`.

	* At the destination the packet ejects by port 0 keeping its channel.
	* A fresh injection starts the first phase on the base channel of its class.
	* Arriving by a hypercube port continues the same phase past the consumed
	  dimension; exhausting the phase takes its global hop on the same channel.
	* Arriving by a global port advances to the next phase and the next channel.
	* When a phase ends with no global hop planned the walk drops directly into the
	  next phase, also advancing the channel (the in-group phase change).

	Panics when the computed channel leaves the class partition, which means the
	planner and the forwarder disagree about the path.
	**/
	pub fn forwarding_step(&self, data:&PolarFlyPlusData, current_router:usize, entry_port:usize, entry_virtual_channel:usize, path:&PolarPath, class:PacketClass, target_router:usize) -> (usize,usize)
	{
		if current_router==target_router
		{
			return (0,entry_virtual_channel);
		}
		let vcs_per_class = self.vcs_per_class();
		let base = class.base_virtual_channel(vcs_per_class);
		let hypercube_ports = data.hypercube_ports();
		let mut virtual_channel;
		let mut start_position;
		if entry_port==0
		{
			//Fresh injection.
			virtual_channel = base;
			start_position = 0;
		}
		else if entry_port<=hypercube_ports
		{
			//Hypercube arrival: continue the same phase past the consumed dimension.
			virtual_channel = entry_virtual_channel;
			let consumed_dimension = entry_port-1;
			let position = (0..hypercube_ports).find(|&p|*self.orders.get(virtual_channel,p)==consumed_dimension)
				.unwrap_or_else(||panic!("dimension {} is not in the order of channel {}",consumed_dimension,virtual_channel));
			start_position = position+1;
		}
		else
		{
			//Global arrival: the next phase begins.
			virtual_channel = entry_virtual_channel+1;
			start_position = 0;
		}
		loop
		{
			assert!( virtual_channel>=base && virtual_channel<base+vcs_per_class,
				"channel {} outside the partition of {:?}: the stored path disagrees with the forwarder",virtual_channel,class );
			let phase = virtual_channel-base;
			let mask = path.mask_of_phase(phase);
			for position in start_position..hypercube_ports
			{
				let dimension = *self.orders.get(virtual_channel,position);
				if mask & (1<<dimension) != 0
				{
					return (data.hypercube_port(dimension),virtual_channel);
				}
			}
			let global = path.global_of_phase(phase);
			if global!=0
			{
				return (global,virtual_channel);
			}
			//No global hop planned: fall through into the next phase locally.
			virtual_channel += 1;
			start_position = 0;
		}
	}
}

impl Routing for PolarFlyPlusSource
{
	fn next(&self, routing_info:&RoutingInfo, topology:&dyn Topology, current_router:usize, target_router:usize, _target_server:Option<usize>, class:PacketClass, num_virtual_channels:usize, _rng: &mut StdRng) -> Result<RoutingNextCandidates,Error>
	{
		assert_eq!( num_virtual_channels, self.num_vcs, "the router grants {} virtual channels but the routing partitions {}",num_virtual_channels,self.num_vcs );
		let data = topology.polarflyplus_data().expect("PolarFlyPlusSource requires a PolarFly+ topology");
		let route = match routing_info.planned_route
		{
			Some(ref route) => route,
			None => return Err(error!(undetermined).with_message(format!("routing info of a packet at router {} has no planned route",current_router))),
		};
		if !route.is_routable()
		{
			return Err(error!(unroutable_packet,current_router,target_router));
		}
		let (exit_port,exit_virtual_channel) = self.forwarding_step(data,current_router,routing_info.entry_port,routing_info.entry_virtual_channel,&route.path,class,target_router);
		if self.verbose
		{
			println!("{}",forwarding_line(current_router,routing_info.entry_port,routing_info.entry_virtual_channel,exit_port,exit_virtual_channel));
		}
		let mut egress = CandidateEgress::new(exit_port,exit_virtual_channel);
		egress.estimated_remaining_hops = Some(route.path.total_hops().saturating_sub(routing_info.hops));
		Ok(RoutingNextCandidates{candidates:vec![egress],idempotent:true})
	}
	fn initialize_routing_info(&self, routing_info:&RefCell<RoutingInfo>, topology:&dyn Topology, current_router:usize, target_router:usize, _target_server:Option<usize>, class:PacketClass, _rng: &mut StdRng)
	{
		let data = topology.polarflyplus_data().expect("PolarFlyPlusSource requires a PolarFly+ topology");
		let faults = topology.fault_table().expect("PolarFlyPlusSource requires the topology to own a fault table");
		let route = self.plan_route(data,faults,current_router,target_router,class);
		if self.verbose
		{
			let move_mask = data.coordinate_of(current_router) ^ data.coordinate_of(target_router);
			println!("{}",route.summary_line(current_router,target_router,move_mask));
		}
		let mut info = routing_info.borrow_mut();
		info.planned_route = Some(route);
		info.entry_port = 0;
		info.entry_virtual_channel = class.base_virtual_channel(self.vcs_per_class());
	}
	fn update_routing_info(&self, routing_info:&RefCell<RoutingInfo>, _topology:&dyn Topology, _current_router:usize, current_port:usize, _target_router:usize, _target_server:Option<usize>, _rng: &mut StdRng)
	{
		routing_info.borrow_mut().entry_port = current_port;
	}
	fn initialize(&mut self, topology:&dyn Topology, _rng: &mut StdRng)
	{
		let data = topology.polarflyplus_data().expect("PolarFlyPlusSource requires a PolarFly+ topology");
		self.orders = build_order_table(data.hypercube_ports(),self.vcs_per_class());
	}
	fn performed_request(&self, requested:&CandidateEgress, routing_info:&RefCell<RoutingInfo>, _topology:&dyn Topology, _current_router:usize, _target_router:usize, _target_server:Option<usize>, _num_virtual_channels:usize, _rng:&mut StdRng)
	{
		//The granted channel is the one the packet will occupy on the link, this is,
		//the inbound channel at the next router.
		routing_info.borrow_mut().entry_virtual_channel = requested.virtual_channel;
	}
	fn statistics(&self,_cycle:Time) -> Option<ConfigurationValue>
	{
		Some(ConfigurationValue::Object("PolarFlyPlusSourceStatistics".to_string(),vec![
			("unroutable_count".to_string(),ConfigurationValue::Number(*self.unroutable_count.borrow() as f64)),
			("nonminimal_count".to_string(),ConfigurationValue::Number(*self.nonminimal_count.borrow() as f64)),
		]))
	}
	fn reset_statistics(&mut self,_next_cycle:Time)
	{
		*self.unroutable_count.borrow_mut() = 0;
		*self.nonminimal_count.borrow_mut() = 0;
	}
}
