use crate::route::bits::{bit, clear_host_bits, common_prefix_len, ADDR_BITS};
use std::fmt::{Display, Formatter};
use std::net::Ipv6Addr;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrieError {
    #[error("Invalid prefix length {0}")]
    InvalidPrefixLen(u8),
}

struct Node<R> {
    // already cleared below this node's absolute prefix length
    prefix: u128,
    // bits contributed by this node, relative to its depth
    bits_len: u8,
    // Some iff the node is a configured prefix
    route: Option<R>,
    left: Option<Box<Node<R>>>,
    right: Option<Box<Node<R>>>,
}

impl<R> Node<R> {
    fn new(prefix: u128, bits_len: u8, route: Option<R>) -> Self {
        Self {
            prefix,
            bits_len,
            route,
            left: None,
            right: None,
        }
    }

    fn child(&self, side: u8) -> Option<&Node<R>> {
        match side {
            0 => self.left.as_deref(),
            _ => self.right.as_deref(),
        }
    }

    fn child_mut(&mut self, side: u8) -> &mut Option<Box<Node<R>>> {
        match side {
            0 => &mut self.left,
            _ => &mut self.right,
        }
    }
}

/// Result of a longest-prefix-match lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteMatch<'a, R> {
    pub network: Ipv6Addr,
    pub prefix_len: u8,
    pub route: &'a R,
}

impl<R> Display for RouteMatch<'_, R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

/// Binary Patricia trie over IPv6 prefixes. The root stands for `::/0`.
pub struct PatriciaTrie<R> {
    root: Node<R>,
    prefixes: usize,
    nodes: usize,
}

impl<R> Default for PatriciaTrie<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> PatriciaTrie<R> {
    pub fn new() -> Self {
        Self {
            root: Node::new(0, 0, None),
            prefixes: 0,
            nodes: 1,
        }
    }

    /// Insert `addr/prefix_len`; host bits of `addr` are ignored.
    /// Returns the route previously stored under the same prefix.
    pub fn insert(
        &mut self,
        addr: Ipv6Addr,
        prefix_len: u8,
        route: R,
    ) -> Result<Option<R>, TrieError> {
        if prefix_len > ADDR_BITS {
            return Err(TrieError::InvalidPrefixLen(prefix_len));
        }
        let addr = clear_host_bits(u128::from(addr), prefix_len);
        if prefix_len == 0 {
            return Ok(attach(&mut self.root.route, route, &mut self.prefixes));
        }

        let mut node = &mut self.root;
        let mut depth = 0u8;
        loop {
            let slot = node.child_mut(bit(addr, depth));
            let child = match slot {
                Some(child) => child,
                None => {
                    *slot = Some(Box::new(Node::new(addr, prefix_len - depth, Some(route))));
                    self.nodes += 1;
                    self.prefixes += 1;
                    return Ok(None);
                }
            };

            let span_end = depth + child.bits_len;
            let matched = common_prefix_len(addr, child.prefix, span_end).min(prefix_len);
            if matched == span_end {
                depth = span_end;
                if depth == prefix_len {
                    return Ok(attach(&mut child.route, route, &mut self.prefixes));
                }
                node = &mut **child;
                continue;
            }

            // Split `child` at `matched`. The branch node takes over the child's
            // slot and the old child hangs below it with a shorter span.
            let branch = Node::new(clear_host_bits(addr, matched), matched - depth, None);
            let mut old = std::mem::replace(&mut **child, branch);
            old.bits_len = span_end - matched;
            let old_side = bit(old.prefix, matched);
            self.nodes += 1;
            if matched == prefix_len {
                child.route = Some(route);
                self.prefixes += 1;
                *child.child_mut(old_side) = Some(Box::new(old));
            } else {
                let leaf = Node::new(addr, prefix_len - matched, Some(route));
                *child.child_mut(old_side) = Some(Box::new(old));
                *child.child_mut(old_side ^ 1) = Some(Box::new(leaf));
                self.nodes += 1;
                self.prefixes += 1;
            }
            tracing::trace!(
                "[Route] Split at bit {} while inserting {}/{}",
                matched,
                Ipv6Addr::from(addr),
                prefix_len
            );
            return Ok(None);
        }
    }

    /// Longest-prefix match for `addr`. `None` means there is no route.
    pub fn search(&self, addr: Ipv6Addr) -> Option<RouteMatch<'_, R>> {
        let addr = u128::from(addr);
        let mut node = &self.root;
        let mut depth = 0u8;
        let mut last = self.root.route.as_ref().map(|route| (0u128, 0u8, route));
        while depth < ADDR_BITS {
            let Some(child) = node.child(bit(addr, depth)) else {
                break;
            };
            let span_end = depth + child.bits_len;
            // a partial match rules out anything more specific below
            if common_prefix_len(addr, child.prefix, span_end) != span_end {
                break;
            }
            if let Some(route) = child.route.as_ref() {
                last = Some((child.prefix, span_end, route));
            }
            node = child;
            depth = span_end;
        }
        last.map(|(prefix, prefix_len, route)| RouteMatch {
            network: Ipv6Addr::from(prefix),
            prefix_len,
            route,
        })
    }

    /// Number of configured prefixes.
    pub fn len(&self) -> usize {
        self.prefixes
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes == 0
    }

    /// Number of nodes including the root and branch points.
    pub fn node_count(&self) -> usize {
        self.nodes
    }

    /// All configured prefixes in depth-first order, left (0) before right (1).
    pub fn routes(&self) -> Vec<RouteMatch<'_, R>> {
        let mut out = Vec::with_capacity(self.prefixes);
        let mut stack = vec![(&self.root, 0u8)];
        while let Some((node, depth)) = stack.pop() {
            let prefix_len = depth + node.bits_len;
            if let Some(route) = node.route.as_ref() {
                out.push(RouteMatch {
                    network: Ipv6Addr::from(node.prefix),
                    prefix_len,
                    route,
                });
            }
            if let Some(right) = node.right.as_deref() {
                stack.push((right, prefix_len));
            }
            if let Some(left) = node.left.as_deref() {
                stack.push((left, prefix_len));
            }
        }
        out
    }
}

fn attach<R>(slot: &mut Option<R>, route: R, prefixes: &mut usize) -> Option<R> {
    let old = slot.replace(route);
    if old.is_none() {
        *prefixes += 1;
    }
    old
}
