//! Drill-down navigation.
//!
//! A link has the form `<segment>.<id>`, e.g. `file.3f2a...`. The segment
//! selects a route from an explicit table; the route says which level to
//! search and which view the found node opens in.
use crate::level::CoverageLevel;
use crate::node::{CoverageNode, NodeId};

/// How a resolved node is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Annotated source of a single file.
    Source,
    /// Coverage summary of a subtree.
    Coverage,
}

/// Result of resolving a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Source(&'a CoverageNode),
    Coverage(&'a CoverageNode),
    /// The link was broken; stay on the current page.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Route {
    segment: String,
    level: CoverageLevel,
    view: View,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Router {
    routes: Vec<Route>,
}

impl Default for Router {
    /// One route per structural level; files open the source view.
    fn default() -> Self {
        let mut router = Router { routes: Vec::new() };
        for level in CoverageLevel::ALL.into_iter().filter(|l| l.is_structural()) {
            let view = if level == CoverageLevel::File {
                View::Source
            } else {
                View::Coverage
            };
            router.register(level.as_str(), level, view);
        }
        router
    }
}

impl Router {
    /// Add or replace the route for `segment`.
    pub fn register(&mut self, segment: &str, level: CoverageLevel, view: View) {
        self.routes.retain(|r| r.segment != segment);
        self.routes.push(Route {
            segment: segment.to_string(),
            level,
            view,
        });
    }

    /// The link that [`Router::resolve`] maps back to the node with `id`.
    pub fn link(&self, level: CoverageLevel, id: NodeId) -> Option<String> {
        self.routes
            .iter()
            .find(|r| r.level == level)
            .map(|r| format!("{}.{id}", r.segment))
    }

    pub fn resolve<'a>(&self, root: &'a CoverageNode, link: &str) -> Target<'a> {
        let Some((segment, id)) = link.split_once('.') else {
            return Target::Fallback;
        };
        let Some(route) = self.routes.iter().find(|r| r.segment == segment) else {
            return Target::Fallback;
        };
        let Ok(id) = id.parse::<NodeId>() else {
            return Target::Fallback;
        };
        match root.find(route.level, id) {
            Some(node) => match route.view {
                View::Source => Target::Source(node),
                View::Coverage => Target::Coverage(node),
            },
            None => Target::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratio::Ratio;

    fn tree() -> CoverageNode {
        let mut root = CoverageNode::new(CoverageLevel::Module, "m");
        root.child_or_insert(CoverageLevel::Package, "p")
            .child_or_insert(CoverageLevel::File, "a.rs")
            .record(CoverageLevel::Line, Ratio::new(1, 2).unwrap());
        root
    }

    #[test]
    fn test_file_link_opens_source() {
        let root = tree();
        let router = Router::default();
        let link = router
            .link(CoverageLevel::File, NodeId::of("m/p/a.rs"))
            .unwrap();
        assert!(link.starts_with("file."));
        match router.resolve(&root, &link) {
            Target::Source(node) => assert_eq!(node.name(), "a.rs"),
            other => panic!("unexpected target {other:?}"),
        }
    }

    #[test]
    fn test_package_link_opens_coverage() {
        let root = tree();
        let router = Router::default();
        let link = format!("package.{}", NodeId::of("m/p"));
        assert!(matches!(
            router.resolve(&root, &link),
            Target::Coverage(node) if node.name() == "p"
        ));
    }

    #[test]
    fn test_broken_links_fall_back() {
        let root = tree();
        let router = Router::default();
        assert_eq!(router.resolve(&root, "file"), Target::Fallback);
        assert_eq!(router.resolve(&root, "line.0000000000000001"), Target::Fallback);
        assert_eq!(router.resolve(&root, "file.not-hex"), Target::Fallback);
        assert_eq!(
            router.resolve(&root, &format!("file.{}", NodeId::of("m/p/missing.rs"))),
            Target::Fallback
        );
        // Right id, wrong route.
        assert_eq!(
            router.resolve(&root, &format!("package.{}", NodeId::of("m/p/a.rs"))),
            Target::Fallback
        );
    }

    #[test]
    fn test_register_overrides_route() {
        let root = tree();
        let mut router = Router::default();
        router.register("file", CoverageLevel::File, View::Coverage);
        let link = format!("file.{}", NodeId::of("m/p/a.rs"));
        assert!(matches!(router.resolve(&root, &link), Target::Coverage(_)));
    }
}
