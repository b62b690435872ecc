use std::cell::RefCell;

use rand::rngs::StdRng;
use rand::SeedableRng;

use polarflyplus_lib::*;
use polarflyplus_lib::config::ConfigurationValue;
use polarflyplus_lib::error::Error;
use polarflyplus_lib::routing::{new_routing,PacketClass,PlannedRoute,Routing,RoutingBuilderArgument,RoutingInfo};
use polarflyplus_lib::topology::{new_topology,Location,Topology,TopologyBuilderArgument};

/*
    Auxiliary functions to create the configuration values for the tests, plus a
    walker playing the advance loop of the embedding simulator: it asks the routing
    for the planned egress at each router and moves the packet along the wires of
    the topology until ejection.
*/

/// Encapsulates the parameters needed to create a PolarFly+ topology
pub struct PolarFlyPlusBuilder
{
    ///Hypercube ports per router.
    pub hypercube_ports: f64,
    ///PolarFly ports per router, selecting the connection table.
    pub polarfly_ports: f64,
    ///Routers to mark down, with the seed of the placement RNG.
    pub failures: Option<(f64,f64)>,
}

/// Creates a Configuration Value with the parameters for a PolarFly+ topology
pub fn create_polarflyplus_topology(arg: PolarFlyPlusBuilder) -> ConfigurationValue
{
    let mut pairs = vec![
        ("k".to_string(), ConfigurationValue::Number(arg.hypercube_ports)),
        ("n".to_string(), ConfigurationValue::Number(arg.polarfly_ports)),
    ];
    if let Some((amount,seed)) = arg.failures
    {
        pairs.push(("link_failures".to_string(), ConfigurationValue::Number(amount)));
        pairs.push(("fail_seed".to_string(), ConfigurationValue::Number(seed)));
    }
    ConfigurationValue::Object("PolarFlyPlus".to_string(), pairs)
}

/// Creates a Configuration Value for the source-planned routing
pub fn create_source_routing(num_vcs: f64) -> ConfigurationValue
{
    ConfigurationValue::Object("PolarFlyPlusSource".to_string(), vec![
        ("num_vcs".to_string(), ConfigurationValue::Number(num_vcs)),
    ])
}

/// Builds the topology and the initialized routing from their configuration values.
pub fn build_network(topology_cv:&ConfigurationValue, routing_cv:&ConfigurationValue) -> (Box<dyn Topology>,Box<dyn Routing>)
{
    let plugs = Plugs::default();
    let mut rng = StdRng::seed_from_u64(10u64);
    let topology = new_topology(TopologyBuilderArgument{cv:topology_cv,plugs:&plugs,rng:&mut rng});
    let mut routing = new_routing(RoutingBuilderArgument{cv:routing_cv,plugs:&plugs});
    routing.initialize(&*topology,&mut rng);
    (topology,routing)
}

/// What the walker saw while carrying one packet from its source to its destination.
pub struct WalkOutcome
{
    ///The route stored in the packet at injection.
    pub planned: PlannedRoute,
    ///Router-to-router hops performed.
    pub hops: usize,
    ///Every router entered, the source first.
    pub visited: Vec<usize>,
    ///The virtual channel granted for each hop.
    pub channels: Vec<usize>,
}

/**
Carry one packet hop by hop: initialize the routing info at the source, then at
every router request the candidates, follow the single planned egress through the
topology wires, and perform the bookkeeping the simulator would (granted request,
hop count, entry port of the next router). Ends at the ejection port of the
destination. Errors are returned as the routing produced them, in particular for
unroutable packets.
**/
pub fn walk_route(topology:&dyn Topology, routing:&dyn Routing, source:usize, target:usize, class:PacketClass, num_vcs:usize) -> Result<WalkOutcome,Error>
{
    let mut rng = StdRng::seed_from_u64(10u64);
    let info = RefCell::new(RoutingInfo::new());
    routing.initialize_routing_info(&info,topology,source,target,Some(target),class,&mut rng);
    let planned = info.borrow().planned_route.clone().expect("the routing stored no planned route");
    let mut current = source;
    let mut visited = vec![source];
    let mut channels = Vec::new();
    let mut hops = 0;
    //a walk can never exceed the hops of the longest escape route
    let bound = 3*topology.diameter()+4;
    loop
    {
        let egress =
        {
            let borrowed = info.borrow();
            let candidates = routing.next(&borrowed,topology,current,target,Some(target),class,num_vcs,&mut rng)?;
            assert!( candidates.idempotent, "source-planned candidates must be idempotent" );
            assert_eq!( candidates.len(), 1, "the planned route allows a single egress" );
            candidates.candidates[0].clone()
        };
        if egress.port==0
        {
            assert_eq!( current, target, "ejecting at router {} instead of the destination {}",current,target );
            break;
        }
        routing.performed_request(&egress,&info,topology,current,target,Some(target),num_vcs,&mut rng);
        channels.push(egress.virtual_channel);
        let (location,_link_class) = topology.neighbour(current,egress.port);
        let (next_router,next_port) = match location
        {
            Location::RouterPort{router_index,router_port} => (router_index,router_port),
            _ => panic!("the routing sent the packet to port {} of router {}, which is not a router link",egress.port,current),
        };
        hops += 1;
        assert!( hops<=bound, "walk from {} to {} exceeded {} hops",source,target,bound );
        info.borrow_mut().hops = hops;
        routing.update_routing_info(&info,topology,next_router,next_port,target,Some(target),&mut rng);
        current = next_router;
        visited.push(current);
    }
    Ok(WalkOutcome{planned,hops,visited,channels})
}

/// Asserts the virtual-channel discipline of one walk: every channel inside the
/// half of the class and never decreasing along the path.
pub fn check_channel_partition(outcome:&WalkOutcome, class:PacketClass, num_vcs:usize)
{
    let vcs_per_class = num_vcs/2;
    let base = class.base_virtual_channel(vcs_per_class);
    let mut previous = base;
    for &channel in &outcome.channels
    {
        assert!( channel>=base && channel<base+vcs_per_class, "channel {} outside the half of {:?}",channel,class );
        assert!( channel>=previous, "channel went back from {} to {}",previous,channel );
        previous = channel;
    }
}
