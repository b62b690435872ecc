
/*!

A Topology defines the way routers and NICs are connected.

This crate wires the PolarFly+ construction: a hypercube inside each group and a
PolarFly graph across groups. See [`new_topology`](fn.new_topology.html) for the
configuration syntax.

Unlike flat topologies where the compute ports come last, PolarFly+ routers place
the CPU/NIC at port 0, the hypercube neighbours at ports `1..=H`, and the global
PolarFly links at ports `H+1..=H+P`. The routing core keys on this layout, so the
`Topology` trait here follows it.

*/

pub mod polarflyplus;

use ::rand::{rngs::StdRng};

use quantifiable_derive::Quantifiable;//the derive macro
use self::polarflyplus::{PolarFlyPlus,PolarFlyPlusData};
use crate::config::ConfigurationValue;
use crate::fault::FaultTable;
use crate::matrix::Matrix;
use crate::quantify::Quantifiable;
use crate::{Plugs,Time};

/// Some things most uses of the topology module will use.
pub mod prelude
{
	pub use super::{Topology,Location,TopologyBuilderArgument,new_topology,NeighbourRouterIteratorItem};
	pub use ::rand::rngs::StdRng;
}

///A location where a phit can be inserted.
#[derive(Clone,Debug,Quantifiable,Hash,Eq,PartialEq)]
pub enum Location
{
	RouterPort{
		router_index: usize,
		router_port: usize,
	},
	ServerPort(usize),
	None,
}

///Item for iterators of neighbour routers.
#[derive(Debug)]
pub struct NeighbourRouterIteratorItem
{
	///Port of the current router that goes to the neighbour.
	pub port_index:usize,
	///Link class of the link to the neighbour router.
	pub link_class:usize,
	///The index of the neighbour router.
	pub neighbour_router: usize,
	///The port index of the neighbour router corresponding to the same physical link.
	pub neighbour_port: usize,
}

///Link class of the hypercube links inside a group.
pub const LINK_CLASS_HYPERCUBE: usize = 0;
///Link class of the global PolarFly links between groups.
pub const LINK_CLASS_GLOBAL: usize = 1;
///Link class of the injection/ejection links.
pub const LINK_CLASS_SERVER: usize = 2;

///Latency of router-to-router channels, in time-units. Contract surface.
pub const ROUTER_LINK_LATENCY: Time = 80;
///Latency of injection/ejection channels, in time-units. Contract surface.
pub const SERVER_LINK_LATENCY: Time = 600;

/**
A directed channel of the network. Every physical link materializes as the two
channels of opposite direction; a credit channel of the same latency runs back
along each of them, owned by the router microarchitecture.
**/
#[derive(Clone,Debug,Quantifiable)]
pub struct Channel
{
	pub source: Location,
	pub target: Location,
	pub link_class: usize,
	pub latency: Time,
}

///A topology describes how routers and servers are connected.
///The router `index` has `ports(index)` ports, of which `degree(index)` reach other routers.
pub trait Topology : Quantifiable + std::fmt::Debug
{
	fn num_routers(&self) -> usize;
	fn num_servers(&self) -> usize;
	///Neighbours of a router: Location+link class index.
	fn neighbour(&self, router_index:usize, port:usize) -> (Location,usize);
	///The neighbour of a server: Location+link class index.
	fn server_neighbour(&self, server_index:usize) -> (Location,usize);
	///The greatest router-to-router distance.
	fn diameter(&self) -> usize;
	///Distance from a router to another.
	fn distance(&self,origin:usize,destination:usize) -> usize;
	/**
	The maximum value returned by [degree]. You possibly want to override the default method to avoid its O(n) cost.
	**/
	fn maximum_degree(&self) -> usize
	{
		(0..self.num_routers()).map(|router_index|self.degree(router_index)).max().expect("calling maximum_degree without routers")
	}
	/**
	The minimum value returned by [degree]. You possibly want to override the default method to avoid its O(n) cost.
	**/
	fn minimum_degree(&self) -> usize
	{
		(0..self.num_routers()).map(|router_index|self.degree(router_index)).min().expect("calling minimum_degree without routers")
	}
	/// Number of ports used to other routers.
	fn degree(&self, router_index: usize) -> usize;
	fn ports(&self, router_index: usize) -> usize;
	///Iterate over the neighbour routers, skipping non-connected ports and ports towards servers.
	fn neighbour_router_iter<'a>(&'a self, router_index:usize) -> Box<dyn Iterator<Item=NeighbourRouterIteratorItem> + 'a>
	{
		let np = self.ports(router_index);
		let iterator = (0..np).filter_map(move |port_index|{
			let (location,link_class) = self.neighbour(router_index,port_index);
			match location
			{
				Location::RouterPort {router_index: neighbour_router, router_port: neighbour_port} =>
				{
					Some(NeighbourRouterIteratorItem{port_index,link_class,neighbour_router,neighbour_port})
				},
				_ => None,
			}
		});
		Box::new(iterator)
	}
	///The latency assigned to channels of a link class.
	fn link_class_latency(&self, link_class:usize) -> Time
	{
		if link_class==LINK_CLASS_SERVER { SERVER_LINK_LATENCY } else { ROUTER_LINK_LATENCY }
	}
	/**
	Enumerate every directed channel of the network, with its link class and latency.
	Router-to-router channels come first, `num_routers*degree` of them; the
	injection and ejection channels follow.
	**/
	fn channels(&self) -> Vec<Channel>
	{
		let n = self.num_routers();
		let mut result = Vec::new();
		for router_index in 0..n
		{
			for port in 0..self.ports(router_index)
			{
				let (location,link_class) = self.neighbour(router_index,port);
				if let Location::RouterPort{..} = location
				{
					result.push(Channel{
						source: Location::RouterPort{router_index,router_port:port},
						target: location,
						link_class,
						latency: self.link_class_latency(link_class),
					});
				}
			}
		}
		for server_index in 0..self.num_servers()
		{
			let (location,link_class) = self.server_neighbour(server_index);
			let latency = self.link_class_latency(link_class);
			if let Location::RouterPort{router_index,router_port} = location
			{
				result.push(Channel{
					source: Location::RouterPort{router_index,router_port},
					target: Location::ServerPort(server_index),
					link_class,
					latency,
				});
				result.push(Channel{
					source: Location::ServerPort(server_index),
					target: Location::RouterPort{router_index,router_port},
					link_class,
					latency,
				});
			}
		}
		result
	}
	///Geometry and connection table of PolarFly+ topologies. Other topologies return `None`.
	fn polarflyplus_data(&self) -> Option<&PolarFlyPlusData> { None }
	///The failure map of the network, when the topology owns one.
	fn fault_table(&self) -> Option<&FaultTable> { None }

	///Breadth First Search to compute distances from a router to all others.
	///It may use weights, but if there are multiple paths with different distances it may give a non-minimal distance, since it is not Dijkstra.
	fn bfs(&self, origin:usize, class_weight:Option<&[usize]>) -> Vec<usize>
	{
		let n=self.num_routers();
		#[allow(non_snake_case)]
		let mut R=vec![<usize>::MAX;n];
		R[origin]=0;
		let queue_len=match class_weight
		{
			Some(v)=> n*v.len(),
			None => n,
		};
		let mut queue=vec![0;queue_len];
		let mut queue_read_index=0;//Next to read
		let mut queue_write_index=1;//Next to write
		queue[0]=origin;
		while queue_read_index<queue_write_index
		{
			let best=queue[queue_read_index];
			queue_read_index+=1;
			for NeighbourRouterIteratorItem{link_class,neighbour_router:router_index,..} in self.neighbour_router_iter(best)
			{
				let weight= if let Some(v)=class_weight
				{
					if link_class>=v.len()
					{
						continue//next neighbour
					}
					let x=v[link_class];
					if x==<usize>::MAX
					{
						continue//next neighbour
					}
					x
				}
				else
				{
					1
				};
				let alt=R[best].saturating_add(weight);
				if alt<R[router_index]
				{
					R[router_index]=alt;
					queue[queue_write_index]=router_index;
					queue_write_index+=1;
				}
			}
		}
		return R;
	}

	fn compute_distance_matrix(&self, class_weight:Option<&[usize]>) -> Matrix<usize>
	{
		let n=self.num_routers();
		let mut matrix=Matrix::constant(0,n,n);
		for i in 0..n
		{
			let d=self.bfs(i,class_weight);
			for j in 0..n
			{
				*matrix.get_mut(i,j)=d[j];
			}
		}
		return matrix;
	}

	/**
	Computes the diameter by checking all switch pairs.
	**/
	fn compute_diameter(&self) -> usize
	{
		let mut maximum=0;
		let n=self.num_routers();
		for source in 0..n
		{
			for target in 0..n
			{
				let d=self.distance(source,target);
				if d>maximum
				{
					maximum=d;
				}
			}
		}
		maximum
	}

	///Check pairs (router,port) with
	/// * non-matching endpoint (this is, going backwards a wire you should return to the same router/server)
	/// * a router link placed at the CPU port 0
	/// * optionally check that the link class is within bounds.
	fn check_adjacency_consistency(&self,amount_link_classes: Option<usize>)
	{
		let n=self.num_routers();
		let min_deg= self.minimum_degree();
		let max_deg= self.maximum_degree();
		for router_index in 0..n
		{
			let deg = self.degree(router_index);
			let mut router_port_count = 0;
			for port_index in 0..self.ports(router_index)
			{
				let (neighbour_location, link_class) = self.neighbour(router_index, port_index);
				if let Some(bound) = amount_link_classes
				{
					assert!(link_class<bound,"link class {} out of bound {} for port {} of router {}",link_class,bound,port_index,router_index);
				}
				match neighbour_location
				{
					Location::RouterPort{
						router_index: neighbour_router,
						router_port: neighbour_port,
					} =>
					{
						router_port_count += 1;
						if port_index==0
						{
							panic!("port 0 of router {} must connect to its NIC, not to router {}",router_index,neighbour_router);
						}
						let (rev_location, rev_link_class) = self.neighbour(neighbour_router, neighbour_port);
						match rev_location
						{
							Location::RouterPort{
								router_index: rev_router,
								router_port: rev_port,
							} =>
							{
								if router_index!=rev_router || port_index!=rev_port
								{
									panic!("Non-matching port ({},{}) to ({},{}) non-returns to ({},{}).",router_index,port_index,neighbour_router,neighbour_port,rev_router,rev_port);
								}
							},
							_ => panic!("port {} at router {} connects to another router and it is not returned.",port_index,router_index),
						};
						if link_class!=rev_link_class
						{
							panic!("port {} at router {} has non-matching link class {} vs {}",port_index,router_index,link_class,rev_link_class);
						}
					},
					Location::ServerPort(server_index) =>
					{
						let (rev_location, rev_link_class) = self.server_neighbour(server_index);
						match rev_location
						{
							Location::RouterPort{
								router_index: rev_router,
								router_port: rev_port,
							} =>
							{
								if router_index!=rev_router || port_index!=rev_port
								{
									panic!("Non-matching port ({},{}) to server {} non-returns to ({},{}).",router_index,port_index,server_index,rev_router,rev_port);
								}
							},
							_ => panic!("It does not even return to a router"),
						};
						if link_class!=rev_link_class
						{
							panic!("port {} at router {} has non-matching link class {} vs {}",port_index,router_index,link_class,rev_link_class);
						}
					},
					Location::None => println!("WARNING: disconnected port {} at router {}",port_index,router_index),
				}
			}
			if router_port_count != deg {
				panic!("Reported degree {deg} for router {router} when {count} neighbours have been found.",deg=deg,router=router_index,count=router_port_count);
			}
			if deg > max_deg {
				panic!("The degree (actual and measured) {deg} for router {router} is greater than reported maximum {max}.",deg=deg,router=router_index,max=max_deg);
			}
			if deg < min_deg {
				panic!("The degree (actual and measured) {deg} for router {router} is lower than reported minimum {min}.",deg=deg,router=router_index,min=min_deg);
			}
		}
	}
}

///The argument given to a topology builder function.
pub struct TopologyBuilderArgument<'a>
{
	///A ConfigurationValue::Object defining the topology.
	pub cv: &'a ConfigurationValue,
	///The user defined plugs. In case the topology needs to create elements.
	pub plugs: &'a Plugs,
	///The random number generator to use.
	pub rng: &'a mut StdRng,
}

/**
Build a topology.

## PolarFly+

A hierarchical topology: each group is a hypercube of `2^k` routers and the groups
are joined by the PolarFly graph given by one of the four built-in connection
tables, chosen by the `n` value.

```ignore
PolarFlyPlus{
	/// Hypercube ports per router; each group holds 2^k routers.
	k: 2,
	/// PolarFly ports per router. One of 3, 4, 6, 8, selecting the
	/// 7x3, 13x4, 31x6 or 57x8 connection table.
	n: 3,
	/// Amount of routers to mark down before the simulation. Defaults to 0.
	link_failures: 2,
	/// Seed for fault placement, an integer or "time". Defaults to 0.
	fail_seed: 42,
	/// Extra latency added to every channel. Defaults to 0.
	latency_overhead: 0,
}
```
*/
pub fn new_topology(arg:TopologyBuilderArgument) -> Box<dyn Topology>
{
	if let &ConfigurationValue::Object(ref cv_name, ref _cv_pairs)=arg.cv
	{
		if let Some(builder) = arg.plugs.topologies.get(cv_name)
		{
			return builder(arg);
		}
		match cv_name.as_ref()
		{
			"PolarFlyPlus" => Box::new(PolarFlyPlus::new(arg)),
			_ => panic!("Unknown topology {}",cv_name),
		}
	}
	else
	{
		panic!("Trying to create a topology from a non-Object");
	}
}
