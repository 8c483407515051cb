//! 路由表
//!
//! 插入序保存的路由列表。选路取最长前缀匹配，掩码等长时
//! 先比度量（小者优先），再按插入次序。

use crate::net::prefix_len_of;
use std::net::Ipv4Addr;
use tracing::trace;

/// 一条配置路由。`interface` 是主机接口表中的下标。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub destination: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Option<Ipv4Addr>,
    pub interface: usize,
    pub metric: u32,
}

impl Route {
    fn matches(&self, dst: Ipv4Addr) -> bool {
        let m = u32::from(self.netmask);
        (u32::from(self.destination) & m) == (u32::from(dst) & m)
    }
}

/// 插入序路由表。
#[derive(Debug, Default)]
pub struct RoutingTable {
    routes: Vec<Route>,
}

impl RoutingTable {
    pub fn add(&mut self, route: Route) {
        self.routes.push(route);
    }

    /// 移除首条 (destination, netmask) 相符的路由。
    pub fn remove(&mut self, destination: Ipv4Addr, netmask: Ipv4Addr) -> bool {
        let Some(pos) = self
            .routes
            .iter()
            .position(|r| r.destination == destination && r.netmask == netmask)
        else {
            return false;
        };
        self.routes.remove(pos);
        true
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// 最长前缀匹配；掩码等长先比度量，再保留先插入者。
    pub fn best_match(&self, dst: Ipv4Addr) -> Option<&Route> {
        let mut best: Option<(&Route, u32)> = None;
        for route in &self.routes {
            if !route.matches(dst) {
                continue;
            }
            let len = prefix_len_of(route.netmask);
            let better = match best {
                None => true,
                Some((cur, cur_len)) => {
                    len > cur_len || (len == cur_len && route.metric < cur.metric)
                }
            };
            if better {
                best = Some((route, len));
            }
        }
        trace!(dst = %dst, hit = best.is_some(), "路由查找");
        best.map(|(route, _)| route)
    }
}
