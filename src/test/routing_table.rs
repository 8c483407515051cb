use crate::ip::{Route, RoutingTable};
use crate::net::netmask_from_prefix;
use std::net::Ipv4Addr;

fn route(dest: [u8; 4], prefix: u8, interface: usize, metric: u32) -> Route {
    Route {
        destination: Ipv4Addr::from(dest),
        netmask: netmask_from_prefix(prefix),
        gateway: None,
        interface,
        metric,
    }
}

#[test]
fn longest_prefix_wins() {
    let mut table = RoutingTable::default();
    table.add(route([10, 0, 0, 0], 8, 0, 0));
    table.add(route([10, 1, 0, 0], 16, 1, 0));
    table.add(route([10, 1, 2, 0], 24, 2, 0));

    let hit = table
        .best_match(Ipv4Addr::new(10, 1, 2, 3))
        .expect("route exists");
    assert_eq!(hit.interface, 2);

    let hit = table
        .best_match(Ipv4Addr::new(10, 1, 9, 9))
        .expect("route exists");
    assert_eq!(hit.interface, 1);

    let hit = table
        .best_match(Ipv4Addr::new(10, 200, 0, 1))
        .expect("route exists");
    assert_eq!(hit.interface, 0);
}

#[test]
fn equal_prefix_breaks_tie_by_lower_metric() {
    let mut table = RoutingTable::default();
    table.add(route([10, 0, 0, 0], 24, 0, 5));
    table.add(route([10, 0, 0, 0], 24, 1, 2));

    let hit = table
        .best_match(Ipv4Addr::new(10, 0, 0, 9))
        .expect("route exists");
    assert_eq!(hit.interface, 1);
}

#[test]
fn equal_prefix_and_metric_keeps_earliest_insertion() {
    let mut table = RoutingTable::default();
    table.add(route([10, 0, 0, 0], 24, 0, 1));
    table.add(route([10, 0, 0, 0], 24, 1, 1));

    let hit = table
        .best_match(Ipv4Addr::new(10, 0, 0, 9))
        .expect("route exists");
    assert_eq!(hit.interface, 0);
}

#[test]
fn miss_returns_none() {
    let mut table = RoutingTable::default();
    table.add(route([10, 0, 0, 0], 24, 0, 0));
    assert!(table.best_match(Ipv4Addr::new(172, 16, 0, 1)).is_none());
}

#[test]
fn default_route_matches_everything() {
    let mut table = RoutingTable::default();
    table.add(route([0, 0, 0, 0], 0, 3, 0));
    let hit = table
        .best_match(Ipv4Addr::new(8, 8, 8, 8))
        .expect("default route");
    assert_eq!(hit.interface, 3);
}

#[test]
fn remove_deletes_first_match_only() {
    let mut table = RoutingTable::default();
    table.add(route([10, 0, 0, 0], 24, 0, 0));
    table.add(route([10, 0, 0, 0], 24, 1, 0));

    assert!(table.remove(Ipv4Addr::new(10, 0, 0, 0), netmask_from_prefix(24)));
    assert_eq!(table.routes().len(), 1);
    assert_eq!(table.routes()[0].interface, 1);

    assert!(!table.remove(Ipv4Addr::new(172, 16, 0, 0), netmask_from_prefix(24)));
}
