mod common;

use common::*;

use polarflyplus_lib::routing::PacketClass;
use polarflyplus_lib::routing::polarflyplus::forwarding_line;
use polarflyplus_lib::topology::{LINK_CLASS_SERVER};

const NUM_VCS: usize = 6;

#[test]
fn every_pair_arrives_on_the_small_network()
{
    //the 7-group table with 4 routers per group, 28 routers total
    let topology_cv = create_polarflyplus_topology(PolarFlyPlusBuilder{hypercube_ports:2.0,polarfly_ports:3.0,failures:None});
    let routing_cv = create_source_routing(NUM_VCS as f64);
    let (topology,routing) = build_network(&topology_cv,&routing_cv);
    for class in [PacketClass::ReadRequest,PacketClass::WriteRequest,PacketClass::ReadReply,PacketClass::WriteReply]
    {
        for source in 0..topology.num_routers()
        {
            for target in 0..topology.num_routers()
            {
                let outcome = walk_route(&*topology,&*routing,source,target,class,NUM_VCS)
                    .unwrap_or_else(|e|panic!("no walk from {} to {}: {}",source,target,e));
                assert_eq!( *outcome.visited.last().unwrap(), target );
                //a fault-free fabric plans shortest routes, with as many hops as encoded
                assert_eq!( outcome.hops, topology.distance(source,target) );
                assert_eq!( outcome.hops, outcome.planned.path.total_hops() );
                assert_eq!( outcome.planned.extra_hops, 0 );
                check_channel_partition(&outcome,class,NUM_VCS);
            }
        }
    }
}

#[test]
fn every_pair_arrives_on_the_thirteen_group_network()
{
    //two routers per group under the 13-group table
    let topology_cv = create_polarflyplus_topology(PolarFlyPlusBuilder{hypercube_ports:1.0,polarfly_ports:4.0,failures:None});
    let routing_cv = create_source_routing(NUM_VCS as f64);
    let (topology,routing) = build_network(&topology_cv,&routing_cv);
    assert_eq!( topology.num_routers(), 26 );
    for source in 0..topology.num_routers()
    {
        for target in 0..topology.num_routers()
        {
            let outcome = walk_route(&*topology,&*routing,source,target,PacketClass::ReadRequest,NUM_VCS).unwrap();
            assert_eq!( *outcome.visited.last().unwrap(), target );
            assert_eq!( outcome.hops, topology.distance(source,target) );
            check_channel_partition(&outcome,PacketClass::ReadRequest,NUM_VCS);
        }
    }
}

#[test]
fn same_router_ejects_without_hops()
{
    let topology_cv = create_polarflyplus_topology(PolarFlyPlusBuilder{hypercube_ports:2.0,polarfly_ports:3.0,failures:None});
    let routing_cv = create_source_routing(NUM_VCS as f64);
    let (topology,routing) = build_network(&topology_cv,&routing_cv);
    let outcome = walk_route(&*topology,&*routing,0,0,PacketClass::ReadRequest,NUM_VCS).unwrap();
    assert_eq!( outcome.hops, 0 );
    assert_eq!( outcome.visited, vec![0] );
    assert_eq!( outcome.planned.path.total_hops(), 0 );
}

#[test]
fn one_hypercube_dimension_is_one_hop()
{
    let topology_cv = create_polarflyplus_topology(PolarFlyPlusBuilder{hypercube_ports:2.0,polarfly_ports:3.0,failures:None});
    let routing_cv = create_source_routing(NUM_VCS as f64);
    let (topology,routing) = build_network(&topology_cv,&routing_cv);
    //router 1 differs from router 0 in the lowest coordinate bit
    let outcome = walk_route(&*topology,&*routing,0,1,PacketClass::ReadRequest,NUM_VCS).unwrap();
    assert_eq!( outcome.hops, 1 );
    assert_eq!( outcome.visited, vec![0,1] );
    assert_eq!( outcome.planned.path.hm1, 1 );
    assert_eq!( outcome.planned.path.global_hops(), 0 );
}

#[test]
fn aligned_groups_cross_in_one_global_hop()
{
    let topology_cv = create_polarflyplus_topology(PolarFlyPlusBuilder{hypercube_ports:2.0,polarfly_ports:3.0,failures:None});
    let routing_cv = create_source_routing(NUM_VCS as f64);
    let (topology,routing) = build_network(&topology_cv,&routing_cv);
    //routers 0 and 12 share the coordinate and their groups are adjacent
    let outcome = walk_route(&*topology,&*routing,0,12,PacketClass::ReadRequest,NUM_VCS).unwrap();
    assert_eq!( outcome.hops, 1 );
    assert_eq!( outcome.visited, vec![0,12] );
    assert_eq!( outcome.planned.path.local_hops(), 0 );
    assert_eq!( outcome.planned.path.g1, 3 );
    assert_eq!( outcome.planned.path.g2, 0 );
}

#[test]
fn distant_groups_cross_in_two_global_hops()
{
    let topology_cv = create_polarflyplus_topology(PolarFlyPlusBuilder{hypercube_ports:2.0,polarfly_ports:3.0,failures:None});
    let routing_cv = create_source_routing(NUM_VCS as f64);
    let (topology,routing) = build_network(&topology_cv,&routing_cv);
    //groups 0 and 1 are joined only through group 4
    let outcome = walk_route(&*topology,&*routing,0,4,PacketClass::ReadRequest,NUM_VCS).unwrap();
    assert_eq!( outcome.hops, 2 );
    assert_eq!( outcome.visited, vec![0,16,4] );
    assert_eq!( outcome.planned.path.global_hops(), 2 );
    //the middle phase keeps its own channel even without local moves there
    check_channel_partition(&outcome,PacketClass::ReadRequest,NUM_VCS);
}

#[test]
fn local_moves_and_one_global_compose()
{
    let topology_cv = create_polarflyplus_topology(PolarFlyPlusBuilder{hypercube_ports:2.0,polarfly_ports:3.0,failures:None});
    let routing_cv = create_source_routing(NUM_VCS as f64);
    let (topology,routing) = build_network(&topology_cv,&routing_cv);
    //router 15 sits in the adjacent group 3 at coordinate 3: two local moves plus the crossing
    let outcome = walk_route(&*topology,&*routing,0,15,PacketClass::ReadRequest,NUM_VCS).unwrap();
    assert_eq!( outcome.hops, 3 );
    let path = &outcome.planned.path;
    assert_eq!( (path.hm1 ^ path.hm2 ^ path.hm3), 3 );
    assert_eq!( path.global_hops(), 1 );
    //the moves are pushed into the phase before the crossing
    assert_eq!( path.hm1, 3 );
    assert_eq!( outcome.visited, vec![0,1,3,15] );
}

#[test]
fn request_and_reply_travel_disjoint_channels()
{
    let topology_cv = create_polarflyplus_topology(PolarFlyPlusBuilder{hypercube_ports:2.0,polarfly_ports:3.0,failures:None});
    let routing_cv = create_source_routing(NUM_VCS as f64);
    let (topology,routing) = build_network(&topology_cv,&routing_cv);
    let request = walk_route(&*topology,&*routing,2,21,PacketClass::ReadRequest,NUM_VCS).unwrap();
    let reply = walk_route(&*topology,&*routing,21,2,PacketClass::ReadReply,NUM_VCS).unwrap();
    assert!( request.channels.iter().all(|&vc|vc<NUM_VCS/2) );
    assert!( reply.channels.iter().all(|&vc|vc>=NUM_VCS/2) );
    assert_eq!( request.hops, reply.hops );
}

#[test]
fn forwarder_line_is_stable()
{
    assert_eq!( forwarding_line(7,2,1,4,1), "router:7 in_port:2 in_vc:1 out_port:4 out_vc:1" );
}

#[test]
fn ejection_happens_through_the_nic_link()
{
    let topology_cv = create_polarflyplus_topology(PolarFlyPlusBuilder{hypercube_ports:2.0,polarfly_ports:3.0,failures:None});
    let routing_cv = create_source_routing(NUM_VCS as f64);
    let (topology,_routing) = build_network(&topology_cv,&routing_cv);
    for router in 0..topology.num_routers()
    {
        let (_location,link_class) = topology.neighbour(router,0);
        assert_eq!( link_class, LINK_CLASS_SERVER );
    }
}
