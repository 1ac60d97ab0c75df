use std::{
    collections::{hash_map::DefaultHasher, HashSet},
    hash::{Hash, Hasher},
    rc::Rc,
};

/// Canonical identifier of a binder.
///
/// Source names map onto ids as follows, and printers must honor the same
/// mapping so that `parse(print(t)) == t`:
///
/// * a single letter `a`..`z` is its alphabetic offset, `0..=25`;
/// * `x<N>` is `N` itself;
/// * any other `<c><N>` is `26 * (N + 1) + offset(c)`.
///
/// Ids `0..=25` print as their letter, every other id prints as `x<N>`.
pub type VarId = usize;

const LETTERS: VarId = 26;

pub fn variable_id(name: &str) -> Option<VarId> {
    let mut chars = name.chars();
    let letter = chars.next().filter(char::is_ascii_lowercase)?;
    let offset = (letter as u8 - b'a') as VarId;
    let digits = chars.as_str();
    if digits.is_empty() {
        return Some(offset);
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: VarId = digits.parse().ok()?;
    if letter == 'x' {
        Some(n)
    } else {
        n.checked_add(1)?.checked_mul(LETTERS)?.checked_add(offset)
    }
}

pub fn variable_name(id: VarId) -> String {
    if id < LETTERS {
        char::from(b'a' + id as u8).to_string()
    } else {
        format!("x{id}")
    }
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Term {
    /// `x`
    Variable(VarId),
    /// `\x. t`
    Abstraction(VarId, Rc<Term>),
    /// `t t`
    Application(Rc<Term>, Rc<Term>),
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Variable(id) => f.write_str(&variable_name(*id)),
            Term::Abstraction(var, body) => {
                f.write_fmt(format_args!("\\{}. {body}", variable_name(*var)))
            }
            Term::Application(lhs, rhs) => {
                if let Term::Abstraction(..) = lhs.as_ref() {
                    f.write_fmt(format_args!("({lhs})"))?;
                } else {
                    f.write_fmt(format_args!("{lhs}"))?;
                }
                if let Term::Variable(_) = rhs.as_ref() {
                    f.write_fmt(format_args!(" {rhs}"))
                } else {
                    f.write_fmt(format_args!(" ({rhs})"))
                }
            }
        }
    }
}

impl Term {
    pub fn occurs_free(&self, var: VarId) -> bool {
        match self {
            Term::Variable(id) => *id == var,
            Term::Abstraction(bound, body) => *bound != var && body.occurs_free(var),
            Term::Application(lhs, rhs) => lhs.occurs_free(var) || rhs.occurs_free(var),
        }
    }

    pub fn free_variables(&self) -> HashSet<VarId> {
        fn rec(term: &Term, bound: &mut Vec<VarId>, free: &mut HashSet<VarId>) {
            match term {
                Term::Variable(id) => {
                    if !bound.contains(id) {
                        free.insert(*id);
                    }
                }
                Term::Abstraction(var, body) => {
                    bound.push(*var);
                    rec(body, bound, free);
                    bound.pop();
                }
                Term::Application(lhs, rhs) => {
                    rec(lhs, bound, free);
                    rec(rhs, bound, free);
                }
            }
        }
        let mut free = HashSet::new();
        rec(self, &mut vec![], &mut free);
        free
    }

    pub fn size(&self) -> usize {
        match self {
            Term::Variable(_) => 1,
            Term::Abstraction(_, body) => 1 + body.size(),
            Term::Application(lhs, rhs) => 1 + lhs.size() + rhs.size(),
        }
    }

    /// Equality up to consistent renaming of bound variables.
    pub fn alpha_eq(&self, other: &Term) -> bool {
        fn rec(lhs: &Term, rhs: &Term, scope: &mut Vec<(VarId, VarId)>) -> bool {
            match (lhs, rhs) {
                (Term::Variable(x), Term::Variable(y)) => {
                    match scope.iter().rev().find(|(l, r)| l == x || r == y) {
                        Some((l, r)) => l == x && r == y,
                        None => x == y,
                    }
                }
                (Term::Abstraction(x, m), Term::Abstraction(y, n)) => {
                    scope.push((*x, *y));
                    let eq = rec(m, n, scope);
                    scope.pop();
                    eq
                }
                (Term::Application(f, a), Term::Application(g, b)) => {
                    rec(f, g, scope) && rec(a, b, scope)
                }
                _ => false,
            }
        }
        rec(self, other, &mut vec![])
    }

    /// Every id occurring in the term, binders included.
    pub fn variables(&self) -> HashSet<VarId> {
        fn rec(term: &Term, ids: &mut HashSet<VarId>) {
            match term {
                Term::Variable(id) => {
                    ids.insert(*id);
                }
                Term::Abstraction(var, body) => {
                    ids.insert(*var);
                    rec(body, ids);
                }
                Term::Application(lhs, rhs) => {
                    rec(lhs, ids);
                    rec(rhs, ids);
                }
            }
        }
        let mut ids = HashSet::new();
        rec(self, &mut ids);
        ids
    }

    /// Hash of the term's shape: the variable id, `(abstraction, binder,
    /// hash(body))`, or `(application, hash(function), hash(argument))`.
    pub fn structural_hash(&self) -> u64 {
        let children: Vec<u64> = match self {
            Term::Variable(_) => vec![],
            Term::Abstraction(_, body) => vec![body.structural_hash()],
            Term::Application(lhs, rhs) => vec![lhs.structural_hash(), rhs.structural_hash()],
        };
        self.shape_hash(&children)
    }

    /// One level of [`Term::structural_hash`], given the hashes of the
    /// immediate subterms in order.
    pub fn shape_hash(&self, children: &[u64]) -> u64 {
        let mut hasher = DefaultHasher::new();
        match self {
            Term::Variable(id) => (0u8, id).hash(&mut hasher),
            Term::Abstraction(var, _) => (1u8, var, children[0]).hash(&mut hasher),
            Term::Application(..) => (2u8, children[0], children[1]).hash(&mut hasher),
        }
        hasher.finish()
    }
}
