//! Hash-consed graph reduction.
//!
//! Every term met during a run is interned into an arena of [`GraphNode`]s
//! keyed by its structural hash, combined from the hashes already stored on
//! its children, so structurally identical subterms are one
//! node no matter how many times substitution pastes them into a result.
//! Each node remembers its reduced form, and the reduction of a shared
//! subterm is therefore performed once and reused by every occurrence.
//!
//! The arena lives as long as one [`GraphReducer`]; [`reduce`] creates a new
//! one per call, so nothing is cached across calls.
//!
//! Evaluation order is eager function-first: the function side of an
//! application is normalized before checking whether the application is a
//! redex. Arguments are substituted unreduced.

use std::{collections::HashMap, rc::Rc};

use log::{debug, trace};

use crate::{naive::substitute, strategy::ReduceConfig, term::Term};

#[derive(PartialEq, Eq, Hash, Clone, Copy, derive_more::Display, Debug)]
#[display(fmt = "#{_0}")]
pub struct NodeId(usize);

#[derive(Debug)]
pub struct GraphNode {
    pub term: Rc<Term>,
    pub hash: u64,
    /// Body of an abstraction, or function and argument of an application.
    pub children: Vec<NodeId>,
    /// Set once, when the node has been reduced to normal form.
    pub reduced: Option<NodeId>,
    /// Number of child edges of other nodes pointing at this node.
    pub ref_count: usize,
    reducing: bool,
}

#[derive(Default, PartialEq, Eq, Clone, derive_more::Display, Debug)]
#[display(
    fmt = "{reductions} reductions, {sharing_hits} sharing hits, {memo_hits} memo hits, {unique_nodes} nodes{}",
    "if *exhausted { \" (budget exhausted)\" } else { \"\" }"
)]
pub struct GraphStats {
    pub reductions: usize,
    pub sharing_hits: usize,
    pub unique_nodes: usize,
    pub memo_hits: usize,
    /// A step, depth or cycle guard stopped the run early.
    pub exhausted: bool,
}

pub struct GraphReducer {
    config: ReduceConfig,
    nodes: Vec<GraphNode>,
    table: HashMap<u64, Vec<NodeId>>,
    /// Allocations already interned. Keys stay valid because every node
    /// keeps its `term` alive for the lifetime of the arena.
    interned: HashMap<*const Term, NodeId>,
    stats: GraphStats,
    depth: usize,
}

impl GraphReducer {
    pub fn new(config: ReduceConfig) -> Self {
        Self {
            config,
            nodes: Vec::with_capacity(256),
            table: HashMap::with_capacity(256),
            interned: HashMap::with_capacity(256),
            stats: GraphStats::default(),
            depth: 0,
        }
    }

    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.0]
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            unique_nodes: self.nodes.len(),
            ..self.stats.clone()
        }
    }

    /// Children are already interned, so two terms are equal exactly when
    /// their heads agree and their children are the same nodes.
    fn lookup(&self, hash: u64, term: &Term, children: &[NodeId]) -> Option<NodeId> {
        self.table.get(&hash)?.iter().copied().find(|id| {
            let node = &self.nodes[id.0];
            node.children == children
                && match (node.term.as_ref(), term) {
                    (Term::Variable(x), Term::Variable(y)) => x == y,
                    (Term::Abstraction(x, _), Term::Abstraction(y, _)) => x == y,
                    (Term::Application(..), Term::Application(..)) => true,
                    _ => false,
                }
        })
    }

    fn intern(&mut self, term: Rc<Term>, children: Vec<NodeId>) -> NodeId {
        let hashes = children
            .iter()
            .map(|child| self.nodes[child.0].hash)
            .collect::<Vec<_>>();
        let hash = term.shape_hash(&hashes);
        if let Some(id) = self.lookup(hash, &term, &children) {
            self.stats.sharing_hits += 1;
            return id;
        }
        for child in &children {
            self.nodes[child.0].ref_count += 1;
        }
        let id = NodeId(self.nodes.len());
        self.interned.insert(Rc::as_ptr(&term), id);
        self.nodes.push(GraphNode {
            term,
            hash,
            children,
            reduced: None,
            ref_count: 0,
            reducing: false,
        });
        self.table.entry(hash).or_default().push(id);
        id
    }

    /// Interns `term` and all of its subterms, children before parents, with
    /// an explicit work stack so that deep terms cannot exhaust the call
    /// stack. Subterms whose allocation is already in the arena are not
    /// walked again.
    pub fn build_dag(&mut self, term: &Rc<Term>) -> NodeId {
        let mut work = vec![(term.clone(), false)];
        let mut built: Vec<NodeId> = vec![];
        while let Some((term, expanded)) = work.pop() {
            if !expanded {
                if let Some(&id) = self.interned.get(&Rc::as_ptr(&term)) {
                    self.stats.sharing_hits += 1;
                    built.push(id);
                    continue;
                }
            }
            let arity = match term.as_ref() {
                Term::Variable(_) => 0,
                Term::Abstraction(..) => 1,
                Term::Application(..) => 2,
            };
            if expanded || arity == 0 {
                let children = built.split_off(built.len() - arity);
                let id = self.intern(term, children);
                built.push(id);
                continue;
            }
            work.push((term.clone(), true));
            match term.as_ref() {
                Term::Variable(_) => {}
                Term::Abstraction(_, body) => work.push((body.clone(), false)),
                Term::Application(lhs, rhs) => {
                    work.push((rhs.clone(), false));
                    work.push((lhs.clone(), false));
                }
            }
        }
        // every frame has folded its children, only the root is left
        built[0]
    }

    fn exhaust(&mut self, reason: &str) {
        if !self.stats.exhausted {
            debug!("graph reduction stopped: {reason}");
            self.stats.exhausted = true;
        }
    }

    /// Node for `term`, which the caller knows to be in normal form.
    fn normal_node(&mut self, term: Term) -> NodeId {
        let id = self.build_dag(&Rc::new(term));
        if !self.stats.exhausted {
            self.nodes[id.0].reduced.get_or_insert(id);
        }
        id
    }

    fn application(&mut self, id: NodeId, function: NodeId, argument: NodeId) -> NodeId {
        let children = &self.nodes[id.0].children;
        if children[0] == function && children[1] == argument {
            return id;
        }
        let term = Term::Application(
            self.nodes[function.0].term.clone(),
            self.nodes[argument.0].term.clone(),
        );
        if self.stats.exhausted {
            self.build_dag(&Rc::new(term))
        } else {
            self.normal_node(term)
        }
    }

    /// Reduces the node to normal form, or as far as the budget allows.
    pub fn reduce_node(&mut self, id: NodeId) -> NodeId {
        let node = &self.nodes[id.0];
        if let Some(reduced) = node.reduced {
            self.stats.memo_hits += 1;
            return reduced;
        }
        if self.stats.exhausted {
            return id;
        }
        if node.reducing {
            // the node reduces to itself
            self.exhaust("cycle");
            return id;
        }
        if self.depth >= self.config.max_depth {
            self.exhaust("depth budget");
            return id;
        }

        self.nodes[id.0].reducing = true;
        self.depth += 1;
        let reduced = self.reduce_children(id);
        self.depth -= 1;
        self.nodes[id.0].reducing = false;
        if !self.stats.exhausted {
            self.nodes[id.0].reduced = Some(reduced);
        }
        reduced
    }

    fn reduce_children(&mut self, id: NodeId) -> NodeId {
        let term = self.nodes[id.0].term.clone();
        let children = self.nodes[id.0].children.clone();
        match term.as_ref() {
            Term::Variable(_) => id,
            Term::Abstraction(var, _) => {
                let body = self.reduce_node(children[0]);
                if body == children[0] {
                    return id;
                }
                let term = Term::Abstraction(*var, self.nodes[body.0].term.clone());
                if self.stats.exhausted {
                    self.build_dag(&Rc::new(term))
                } else {
                    self.normal_node(term)
                }
            }
            Term::Application(_, argument) => {
                let function = self.reduce_node(children[0]);
                let function_term = self.nodes[function.0].term.clone();
                if let Term::Abstraction(var, body) = function_term.as_ref() {
                    if self.stats.exhausted {
                        return self.application(id, function, children[1]);
                    }
                    if self.stats.reductions >= self.config.max_steps {
                        self.exhaust("step budget");
                        return self.application(id, function, children[1]);
                    }
                    self.stats.reductions += 1;
                    let result = substitute(body, *var, argument);
                    trace!("beta {}: {result}", self.stats.reductions);
                    let result = self.build_dag(&Rc::new(result));
                    return self.reduce_node(result);
                }
                let argument = self.reduce_node(children[1]);
                self.application(id, function, argument)
            }
        }
    }

    pub fn reduce(&mut self, term: &Term) -> Term {
        let root = self.build_dag(&Rc::new(term.clone()));
        let reduced = self.reduce_node(root);
        debug!("graph reduction: {}", self.stats());
        self.nodes[reduced.0].term.as_ref().clone()
    }
}

/// Reduces `term` with a fresh arena, which is dropped before returning.
pub fn reduce(term: &Term, config: &ReduceConfig) -> (Term, GraphStats) {
    let mut reducer = GraphReducer::new(config.clone());
    let term = reducer.reduce(term);
    (term, reducer.stats())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{naive, naive::is_normal_form, parser::parse};

    fn run(input: &str) -> (Term, GraphStats) {
        reduce(&parse(input).unwrap(), &ReduceConfig::default())
    }

    #[test]
    fn test_reduce() {
        assert_eq!(run("x").0, var!(23));
        assert_eq!(run("(\\x.x) y").0, var!(24));
        assert_eq!(run("((\\x.\\y.x) a) b").0, var!(0));
        assert_eq!(run("\\z. (\\x.x) z").0, parse("\\z. z").unwrap());
    }

    #[test]
    fn test_sharing() {
        let (term, stats) = run("(\\f.\\x.f (f x)) g y");
        assert_eq!(term, parse("g (g y)").unwrap());
        assert!(stats.sharing_hits > 0);
        assert_eq!(stats.reductions, 2);
        assert!(!stats.exhausted);

        // three copies of `g a` collapse onto one node
        let (_, stats) = run("f (g a) (g a) (g a)");
        assert!(stats.sharing_hits >= 2);
        assert_eq!(stats.unique_nodes, 7);
    }

    #[test]
    fn test_ref_count() {
        let mut reducer = GraphReducer::new(ReduceConfig::default());
        let root = reducer.build_dag(&Rc::new(parse("f x x").unwrap()));
        let function = reducer.node(root).children[0];
        let x = reducer.node(root).children[1];
        assert_eq!(reducer.node(function).children[1], x);
        assert_eq!(reducer.node(x).ref_count, 2);
        assert_eq!(reducer.node(function).ref_count, 1);
        assert_eq!(reducer.node(root).ref_count, 0);
        assert_eq!(reducer.stats().unique_nodes, 4);
        assert_eq!(reducer.stats().sharing_hits, 1);

        // finding an existing node adds no edge
        let again = reducer.normal_node(parse("f x").unwrap());
        assert_eq!(again, function);
        assert_eq!(reducer.node(function).ref_count, 1);
        assert_eq!(reducer.node(x).ref_count, 2);
    }

    #[test]
    fn test_node_hashes() {
        let mut reducer = GraphReducer::new(ReduceConfig::default());
        let term = parse("(\\f.\\x.f (f x)) (\\y. y a)").unwrap();
        let root = reducer.build_dag(&Rc::new(term.clone()));
        assert_eq!(reducer.node(root).hash, term.structural_hash());
        for id in 0..reducer.stats().unique_nodes {
            let node = reducer.node(NodeId(id));
            assert_eq!(node.hash, node.term.structural_hash());
        }
    }

    /// `f (f (... (f x)))`, `depth` applications deep.
    fn tower(depth: usize) -> Term {
        let mut term = var!(23);
        for _ in 0..depth {
            term = apply!(var!(5), term);
        }
        term
    }

    /// Drops `term` without recursing once per level.
    fn dismantle(term: Term) {
        let mut stack = vec![term];
        while let Some(term) = stack.pop() {
            match term {
                Term::Variable(_) => {}
                Term::Abstraction(_, body) => stack.extend(Rc::try_unwrap(body).ok()),
                Term::Application(lhs, rhs) => {
                    stack.extend(Rc::try_unwrap(lhs).ok());
                    stack.extend(Rc::try_unwrap(rhs).ok());
                }
            }
        }
    }

    #[test]
    fn test_deep_term_is_cut_off() {
        let term = tower(200_000);
        let (result, stats) = reduce(&term, &ReduceConfig::default());
        assert!(stats.exhausted);
        assert_eq!(stats.reductions, 0);
        // `f`, `x` and one node per application
        assert_eq!(stats.unique_nodes, 200_002);
        // handed back untouched
        match (&result, &term) {
            (Term::Application(f, inner), Term::Application(_, original)) => {
                assert_eq!(**f, var!(5));
                assert!(Rc::ptr_eq(inner, original));
            }
            _ => panic!("not an application"),
        }
        dismantle(result);
        dismantle(term);
    }

    #[test]
    fn test_interning_walks_each_allocation_once() {
        let mut reducer = GraphReducer::new(ReduceConfig::default());
        let deep = Rc::new(tower(50_000));
        let root = reducer.build_dag(&deep);
        let nodes = reducer.stats().unique_nodes;
        let hits = reducer.stats().sharing_hits;
        assert_eq!(nodes, 50_002);
        // only the repeated `f`s: every other subterm is new
        assert_eq!(hits, 49_999);

        // the same allocation again resolves at once
        assert_eq!(reducer.build_dag(&deep), root);
        assert_eq!(reducer.stats().sharing_hits, hits + 1);

        // a new parent over it costs one node and two hits
        let parent = Rc::new(Term::Application(Rc::new(var!(5)), deep.clone()));
        let id = reducer.build_dag(&parent);
        assert_eq!(reducer.node(id).children[1], root);
        assert_eq!(reducer.stats().unique_nodes, nodes + 1);
        assert_eq!(reducer.stats().sharing_hits, hits + 3);

        drop(reducer);
        drop(parent);
        if let Ok(term) = Rc::try_unwrap(deep) {
            dismantle(term);
        }
    }

    #[test]
    fn test_pasted_copies_are_reduced_once() {
        let input = "(\\x. x x) ((\\y.y) a)";
        let (term, stats) = run(input);
        assert_eq!(term, parse("a a").unwrap());
        // the outer redex and one shared reduction of `(\y.y) a`
        assert_eq!(stats.reductions, 2);
        assert!(stats.memo_hits >= 1);
        let (_, steps) = naive::normalize(&parse(input).unwrap(), 100);
        assert_eq!(steps, 3);
    }

    #[test]
    fn test_memoized_forms_are_stable() {
        let mut reducer = GraphReducer::new(ReduceConfig::default());
        let root = reducer.build_dag(&Rc::new(parse("(\\x.x) ((\\y.y) a)").unwrap()));
        let first = reducer.reduce_node(root);
        let reductions = reducer.stats().reductions;
        assert_eq!(reducer.reduce_node(root), first);
        assert_eq!(reducer.stats().reductions, reductions);
        assert_eq!(reducer.node(root).reduced, Some(first));
        assert_eq!(*reducer.node(first).term, var!(0));
    }

    #[test]
    fn test_termination_guard() {
        let omega = parse("(\\x.x x) (\\x.x x)").unwrap();
        let config = ReduceConfig {
            max_steps: 10,
            ..ReduceConfig::default()
        };
        let (term, stats) = reduce(&omega, &config);
        assert_eq!(term, omega);
        assert!(stats.exhausted);
        assert!(stats.reductions <= 10);

        let (term, stats) = reduce(&parse("(\\x.x x x) (\\x.x x x)").unwrap(), &config);
        assert!(stats.exhausted);
        assert!(stats.reductions <= 10);
        assert!(!is_normal_form(&term));
    }

    #[test]
    fn test_step_budget() {
        let four = "(\\m.\\n.\\f.\\x.m f (n f x)) (\\f.\\x.f (f x)) (\\f.\\x.f (f x))";
        let (term, stats) = run(four);
        assert!(!stats.exhausted);
        assert_eq!(term, parse("\\f.\\x.f (f (f (f x)))").unwrap());

        let config = ReduceConfig {
            max_steps: 1,
            ..ReduceConfig::default()
        };
        let (term, stats) = reduce(&parse(four).unwrap(), &config);
        assert!(stats.exhausted);
        assert_eq!(stats.reductions, 1);
        assert!(!is_normal_form(&term));
    }

    #[test]
    fn test_depth_budget() {
        let config = ReduceConfig {
            max_depth: 2,
            ..ReduceConfig::default()
        };
        let input = parse("\\a.\\b.\\c. (\\x.x) a").unwrap();
        let (term, stats) = reduce(&input, &config);
        assert!(stats.exhausted);
        assert_eq!(term, input);
    }

    #[test]
    fn test_function_first_divergence() {
        // normal order discards the divergent argument, function-first does not
        let input = parse("(\\y. y ((\\x.x x) (\\x.x x))) (\\z.a)").unwrap();
        assert_eq!(naive::reduce(&input, 100), var!(0));
        let (term, stats) = reduce(&input, &ReduceConfig::default());
        assert!(stats.exhausted);
        assert!(!is_normal_form(&term));
    }
}
