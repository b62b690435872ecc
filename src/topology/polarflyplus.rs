
use ::rand::{rngs::StdRng};
use quantifiable_derive::Quantifiable;//the derive macro
use super::prelude::*;
use super::{Location,LINK_CLASS_HYPERCUBE,LINK_CLASS_GLOBAL,LINK_CLASS_SERVER};
use crate::config::ConfigurationValue;
use crate::error::Error;
use crate::error;
use crate::fault::{FaultTable,FailureSeed};
use crate::match_object_panic;
use crate::matrix::Matrix;
use crate::quantify::Quantifiable;
use crate::Time;

/**
Builds a PolarFly+ topology: a two-level hierarchy where each group is a hypercube
of `2^k` routers and the groups form a PolarFly graph, the diameter-2 expander
arising from a projective-plane incidence structure. Every router keeps its NIC at
port 0, its hypercube neighbours at ports `1..=k` (port `d+1` flips bit `d` of the
hypercube coordinate) and its global links at ports `k+1..=k+n`. A global link
preserves the hypercube coordinate: port `k+1+i` of a router at coordinate `x` of
group `g` reaches the router at coordinate `x` of group `table[g][i]`.

The PolarFly graph itself is given by one of four built-in connection tables,
selected by the configured number of global ports.

Example configuration:
```ignore
PolarFlyPlus{
	/// Hypercube ports per router; each group holds 2^k routers.
	k: 2,
	/// PolarFly ports per router; selects the 7x3, 13x4, 31x6 or 57x8 table.
	n: 3,
	/// Amount of routers to mark down before the simulation. Defaults to 0.
	link_failures: 0,
	/// Seed for the fault placement, an integer or "time". Defaults to 0.
	fail_seed: 42,
	/// Extra latency added to every channel. Defaults to 0.
	latency_overhead: 0,
}
```
**/
#[derive(Quantifiable)]
#[derive(Debug)]
pub struct PolarFlyPlus
{
	///Geometry and group adjacency, shared with the routing through `polarflyplus_data`.
	data: PolarFlyPlusData,
	///The failure map, built once at construction.
	faults: FaultTable,
	///Extra latency added to every channel.
	latency_overhead: Time,
}

///The group adjacency of the 7-group PolarFly graph, 3 global ports per router.
const POLARFLY_TABLE_7X3 : [[usize;3];7] = [
	[3,4,0],
	[5,4,1],
	[6,4,2],
	[6,5,0],
	[0,1,2],
	[6,3,1],
	[5,3,2],
];

///The group adjacency of the 13-group PolarFly graph, 4 global ports per router.
const POLARFLY_TABLE_13X4 : [[usize;4];13] = [
	[4,5,6,0],
	[7,8,6,1],
	[7,5,9,2],
	[4,8,9,3],
	[7,10,0,3],
	[11,8,0,2],
	[12,9,0,1],
	[4,10,1,2],
	[11,5,1,3],
	[12,6,2,3],
	[12,11,7,4],
	[12,10,8,5],
	[11,10,9,6],
];

///The group adjacency of the 31-group PolarFly graph, 6 global ports per router.
const POLARFLY_TABLE_31X6 : [[usize;6];31] = [
	[6,7,8,9,10,0],
	[6,11,12,13,14,1],
	[15,7,16,17,14,2],
	[15,11,18,19,10,3],
	[20,12,16,18,8,4],
	[20,9,17,19,13,5],
	[20,15,21,0,1,22],
	[0,2,23,12,19,24],
	[0,25,11,4,17,26],
	[0,27,28,18,5,14],
	[0,3,29,16,13,30],
	[1,3,28,8,17,24],
	[1,27,7,4,19,30],
	[1,25,23,16,5,10],
	[1,2,29,18,9,26],
	[20,6,25,2,3,27],
	[22,2,28,4,13,10],
	[21,2,11,8,5,30],
	[21,3,23,4,9,14],
	[22,3,7,12,5,26],
	[15,6,29,4,5,24],
	[22,6,23,18,17,30],
	[21,6,28,16,19,26],
	[21,25,7,18,13,24],
	[20,29,28,7,11,23],
	[15,27,23,8,13,26],
	[22,25,29,8,19,14],
	[15,25,28,12,9,30],
	[22,27,11,16,9,24],
	[20,24,30,14,10,26],
	[21,27,29,12,17,10],
];

///The group adjacency of the 57-group PolarFly graph, 8 global ports per router.
const POLARFLY_TABLE_57X8 : [[usize;8];57] = [
	[8,9,10,11,12,13,14,0],
	[15,16,17,11,18,19,20,1],
	[21,22,23,24,12,19,25,2],
	[26,27,28,24,18,13,29,3],
	[26,22,17,30,31,32,14,4],
	[21,27,10,33,34,32,20,5],
	[15,9,23,33,31,35,29,6],
	[8,16,28,30,34,35,25,7],
	[26,36,23,0,37,38,7,20],
	[39,22,40,0,34,18,6,41],
	[42,43,28,0,31,5,19,44],
	[45,24,33,46,0,1,47,30],
	[48,16,49,0,2,50,32,29],
	[21,51,17,0,3,35,52,53],
	[15,27,54,0,55,4,56,25],
	[21,36,28,1,55,50,6,14],
	[39,27,49,1,31,12,7,53],
	[48,51,23,1,34,4,13,44],
	[42,9,40,1,3,38,32,25],
	[26,43,10,1,2,35,56,41],
	[8,22,54,1,37,5,52,29],
	[15,36,40,30,2,5,13,53],
	[39,9,28,46,2,4,52,20],
	[8,27,17,47,2,38,6,44],
	[45,11,37,2,34,31,3,55],
	[42,51,54,33,2,18,7,14],
	[8,36,49,33,3,4,19,41],
	[39,16,23,47,3,5,56,14],
	[15,22,10,46,3,50,7,44],
	[48,43,54,30,3,12,6,20],
	[21,43,40,47,11,4,7,29],
	[42,16,10,24,37,4,6,53],
	[45,35,50,4,18,12,5,38],
	[26,51,49,46,11,5,6,25],
	[48,9,17,24,55,5,7,41],
	[45,32,13,52,6,7,56,19],
	[45,39,42,21,15,8,26,48],
	[8,51,40,24,31,50,56,20],
	[8,43,23,46,55,18,32,53],
	[45,36,43,9,22,27,16,51],
	[21,9,49,30,37,18,56,44],
	[26,9,54,47,34,50,19,53],
	[48,36,10,47,31,18,52,25],
	[39,51,10,30,55,38,19,29],
	[45,54,17,28,40,49,23,10],
	[39,36,54,24,11,35,32,44],
	[48,22,28,33,11,38,56,53],
	[42,27,23,30,11,50,52,41],
	[42,36,17,46,34,12,56,29],
	[26,16,40,33,55,12,52,44],
	[15,51,28,47,37,12,32,41],
	[39,43,17,33,37,50,13,25],
	[42,22,49,47,55,35,13,20],
	[21,16,54,46,31,38,13,41],
	[45,44,25,20,41,53,14,29],
	[15,43,49,24,34,38,52,14],
	[48,27,40,46,37,35,19,14],
];

/**
The static group-to-group adjacency of the PolarFly graph. Entries equal to the row
group ("red group" self-loops) are permitted by the construction but carry no
traffic; lookups rotate past them.
**/
#[derive(Debug,Quantifiable)]
pub struct ConnectionTable
{
	///`table[group][index]` = peer group of global port `index`.
	table: Matrix<usize>,
}

impl ConnectionTable
{
	///Selects the built-in table matching the given number of global ports per router.
	pub fn for_global_ports(polarfly_ports:usize) -> Result<ConnectionTable,Error>
	{
		fn build<const P:usize>(rows:&[[usize;P]]) -> Matrix<usize>
		{
			Matrix::with_capacity_and_function(rows.len(),P,|row,column|rows[row][column])
		}
		let table = match polarfly_ports
		{
			3 => build(&POLARFLY_TABLE_7X3),
			4 => build(&POLARFLY_TABLE_13X4),
			6 => build(&POLARFLY_TABLE_31X6),
			8 => build(&POLARFLY_TABLE_57X8),
			_ => return Err(error!(bad_argument).with_message(format!("there is no PolarFly connection table with {} ports per router",polarfly_ports))),
		};
		Ok(ConnectionTable{table})
	}
	pub fn number_of_groups(&self) -> usize
	{
		self.table.get_rows()
	}
	pub fn ports_per_group(&self) -> usize
	{
		self.table.get_columns()
	}
	///The group reached from `group` by its global port `index`.
	pub fn peer(&self, group:usize, index:usize) -> usize
	{
		*self.table.get(group,index)
	}
	///Whether entry `index` of `group` is a red-group self-loop.
	pub fn is_self_loop(&self, group:usize, index:usize) -> bool
	{
		self.peer(group,index)==group
	}
	/**
	Scans the row of `source_group` for `target_group`. When the match is a
	self-loop entry the next cyclic index is returned instead, so the result never
	points at a self-loop.
	**/
	pub fn one_hop_index(&self, source_group:usize, target_group:usize) -> Option<usize>
	{
		let ports = self.ports_per_group();
		for index in 0..ports
		{
			if self.peer(source_group,index)==target_group
			{
				return if target_group==source_group
				{
					Some((index+1)%ports)
				} else {
					Some(index)
				};
			}
		}
		None
	}
	/**
	Finds a common intermediate group: the first `(i,j)` with
	`table[source][i]==table[target][j]`, skipping self-loop entries. Returns the
	index `i` at the source side, enough to route since the second hop repeats the
	one-hop search from the intermediate group.
	**/
	pub fn two_hop_index(&self, source_group:usize, target_group:usize) -> Option<usize>
	{
		let ports = self.ports_per_group();
		for i in 0..ports
		{
			let intermediate = self.peer(source_group,i);
			if intermediate==source_group || intermediate==target_group
			{
				continue;
			}
			for j in 0..ports
			{
				if self.peer(target_group,j)==intermediate
				{
					return Some(i);
				}
			}
		}
		None
	}
	///The index on the peer side of the link `table[group][index]`, this is, the `j`
	///with `table[peer][j]==group`. The graph symmetry guarantees exactly one.
	pub fn reverse_index(&self, group:usize, index:usize) -> Option<usize>
	{
		let peer_group = self.peer(group,index);
		(0..self.ports_per_group()).find(|&j|self.peer(peer_group,j)==group)
	}
}

/**
Geometry of a PolarFly+ network, shared between the topology and the routing. The
routing consults it through `Topology::polarflyplus_data`, in the same way cartesian
routings consult `cartesian_data`.
**/
#[derive(Debug,Quantifiable)]
pub struct PolarFlyPlusData
{
	///Hypercube dimensions, the `k` of the configuration.
	hypercube_ports: usize,
	///Global ports per router, the `n` of the configuration.
	polarfly_ports: usize,
	///Routers per group, `2^k`.
	group_size: usize,
	///Amount of groups, the rows of the connection table.
	number_of_groups: usize,
	///The PolarFly group adjacency.
	connection: ConnectionTable,
}

impl PolarFlyPlusData
{
	pub fn new(hypercube_ports:usize, polarfly_ports:usize) -> Result<PolarFlyPlusData,Error>
	{
		let connection = ConnectionTable::for_global_ports(polarfly_ports)?;
		Ok(PolarFlyPlusData{
			hypercube_ports,
			polarfly_ports,
			group_size: 1<<hypercube_ports,
			number_of_groups: connection.number_of_groups(),
			connection,
		})
	}
	pub fn hypercube_ports(&self) -> usize { self.hypercube_ports }
	pub fn polarfly_ports(&self) -> usize { self.polarfly_ports }
	pub fn group_size(&self) -> usize { self.group_size }
	pub fn number_of_groups(&self) -> usize { self.number_of_groups }
	pub fn connection(&self) -> &ConnectionTable { &self.connection }
	pub fn num_routers(&self) -> usize
	{
		self.group_size*self.number_of_groups
	}
	///Ports per router, counting the CPU port.
	pub fn total_ports(&self) -> usize
	{
		self.hypercube_ports+self.polarfly_ports+1
	}
	///The group of a router.
	pub fn group_of(&self, router_index:usize) -> usize
	{
		router_index >> self.hypercube_ports
	}
	///The hypercube coordinate of a router, preserved across global hops.
	pub fn coordinate_of(&self, router_index:usize) -> usize
	{
		router_index & (self.group_size-1)
	}
	///The router at a `(group, hypercube coordinate)` position.
	pub fn pack(&self, group:usize, coordinate:usize) -> usize
	{
		(group<<self.hypercube_ports) | coordinate
	}
	///The router port of hypercube dimension `dimension`.
	pub fn hypercube_port(&self, dimension:usize) -> usize
	{
		dimension+1
	}
	///The table index of a router-relative global port.
	pub fn global_port_index(&self, port:usize) -> usize
	{
		port-self.hypercube_ports-1
	}
	///Whether a router-relative port is a global one.
	pub fn is_global_port(&self, port:usize) -> bool
	{
		port>self.hypercube_ports && port<=self.hypercube_ports+self.polarfly_ports
	}
	/**
	The router-relative global port towards `target_group`: the one-hop table
	lookup, falling back to a common-intermediate search when the groups are not
	adjacent, since the PolarFly graph has diameter 2. Panics if the table offers
	neither, which means a malformed table.
	**/
	pub fn global_port(&self, source_group:usize, target_group:usize) -> usize
	{
		let index = self.connection.one_hop_index(source_group,target_group)
			.or_else(||self.connection.two_hop_index(source_group,target_group))
			.unwrap_or_else(||panic!("the connection table offers no route from group {} to group {}",source_group,target_group));
		self.hypercube_ports+1+index
	}
	///Whether two distinct groups are joined by a global link.
	pub fn groups_adjacent(&self, source_group:usize, target_group:usize) -> bool
	{
		source_group!=target_group && self.connection.one_hop_index(source_group,target_group).map_or(false,|index|!self.connection.is_self_loop(source_group,index))
	}
	///Distance in the PolarFly graph: 0, 1, or 2.
	pub fn group_distance(&self, source_group:usize, target_group:usize) -> usize
	{
		if source_group==target_group
		{
			0
		}
		else if self.groups_adjacent(source_group,target_group)
		{
			1
		}
		else
		{
			debug_assert!( self.connection.two_hop_index(source_group,target_group).is_some() );
			2
		}
	}
	///The amount of global hops of any shortest route between two routers.
	pub fn expected_global_hops(&self, source:usize, target:usize) -> usize
	{
		self.group_distance(self.group_of(source),self.group_of(target))
	}
}

impl Topology for PolarFlyPlus
{
	fn num_routers(&self) -> usize
	{
		self.data.num_routers()
	}
	fn num_servers(&self) -> usize
	{
		//One NIC per router.
		self.data.num_routers()
	}
	fn neighbour(&self, router_index:usize, port: usize) -> (Location,usize)
	{
		let hypercube_ports = self.data.hypercube_ports();
		let polarfly_ports = self.data.polarfly_ports();
		if port==0
		{
			return (Location::ServerPort(router_index),LINK_CLASS_SERVER);
		}
		if port<=hypercube_ports
		{
			let dimension = port-1;
			let neighbour = router_index ^ (1<<dimension);
			//The peer uses the same port for the same dimension.
			return (Location::RouterPort{router_index:neighbour,router_port:port},LINK_CLASS_HYPERCUBE);
		}
		if port<=hypercube_ports+polarfly_ports
		{
			let group = self.data.group_of(router_index);
			let index = self.data.global_port_index(port);
			let peer_group = self.data.connection().peer(group,index);
			let peer_router = self.data.pack(peer_group,self.data.coordinate_of(router_index));
			let reverse = self.data.connection().reverse_index(group,index)
				.unwrap_or_else(||panic!("group {} is not listed back in the row of group {}",group,peer_group));
			let peer_port = hypercube_ports+1+reverse;
			return (Location::RouterPort{router_index:peer_router,router_port:peer_port},LINK_CLASS_GLOBAL);
		}
		panic!("port {} out of the {} ports of router {}",port,self.data.total_ports(),router_index);
	}
	fn server_neighbour(&self, server_index:usize) -> (Location,usize)
	{
		(Location::RouterPort{
			router_index: server_index,
			router_port: 0,
		},LINK_CLASS_SERVER)
	}
	fn diameter(&self) -> usize
	{
		self.data.hypercube_ports()+2
	}
	fn distance(&self,origin:usize,destination:usize) -> usize
	{
		//Local moves commute with global hops, since global links preserve the coordinate.
		let local = (self.data.coordinate_of(origin) ^ self.data.coordinate_of(destination)).count_ones() as usize;
		local + self.data.expected_global_hops(origin,destination)
	}
	fn maximum_degree(&self) -> usize
	{
		self.data.hypercube_ports()+self.data.polarfly_ports()
	}
	fn minimum_degree(&self) -> usize
	{
		self.data.hypercube_ports()+self.data.polarfly_ports()
	}
	fn degree(&self, _router_index: usize) -> usize
	{
		self.data.hypercube_ports()+self.data.polarfly_ports()
	}
	fn ports(&self, _router_index: usize) -> usize
	{
		self.data.total_ports()
	}
	fn link_class_latency(&self, link_class:usize) -> Time
	{
		let base = if link_class==LINK_CLASS_SERVER { super::SERVER_LINK_LATENCY } else { super::ROUTER_LINK_LATENCY };
		base + self.latency_overhead
	}
	fn polarflyplus_data(&self) -> Option<&PolarFlyPlusData>
	{
		Some(&self.data)
	}
	fn fault_table(&self) -> Option<&FaultTable>
	{
		Some(&self.faults)
	}
}

impl PolarFlyPlus
{
	pub fn new(arg:TopologyBuilderArgument) -> PolarFlyPlus
	{
		let mut hypercube_ports=None;
		let mut polarfly_ports=None;
		let mut link_failures=0;
		let mut fail_seed=FailureSeed::Fixed(0);
		let mut latency_overhead=0;
		match_object_panic!(arg.cv,"PolarFlyPlus",value,
			"k" | "hypercube_ports" => hypercube_ports=Some(value.as_usize().expect("bad value for k")),
			"n" | "polarfly_ports" => polarfly_ports=Some(value.as_usize().expect("bad value for n")),
			"link_failures" => link_failures=value.as_usize().expect("bad value for link_failures"),
			"fail_seed" => fail_seed=FailureSeed::from_config(value).expect("bad value for fail_seed"),
			"latency_overhead" => latency_overhead=value.as_u64().expect("bad value for latency_overhead"),
		);
		let hypercube_ports=hypercube_ports.expect("There were no k");
		let polarfly_ports=polarfly_ports.expect("There were no n");
		let data = PolarFlyPlusData::new(hypercube_ports,polarfly_ports).expect("could not build the PolarFly+ geometry");
		let faults = FaultTable::healthy_sized(data.num_routers(),data.total_ports());
		let mut topo=PolarFlyPlus{
			data,
			faults,
			latency_overhead,
		};
		if link_failures>0
		{
			let populated = FaultTable::random_node_failures(&topo,link_failures,fail_seed);
			topo.faults = populated;
		}
		topo
	}
}
