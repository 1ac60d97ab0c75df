use std::{collections::HashSet, rc::Rc};

use log::{debug, trace};

use crate::term::{Term, VarId};

struct Substitution<'a> {
    var: VarId,
    replacement: &'a Term,
    free: HashSet<VarId>,
    /// Ids of `term`, `replacement` and `var`, plus every fresh id handed out.
    used: HashSet<VarId>,
    next_fresh: VarId,
}

impl Substitution<'_> {
    // counts up from past the largest id in use and wraps to the lowest
    // unused ids once `VarId::MAX` is taken
    fn fresh(&mut self) -> VarId {
        while self.used.contains(&self.next_fresh) {
            self.next_fresh = self.next_fresh.wrapping_add(1);
        }
        let fresh = self.next_fresh;
        self.used.insert(fresh);
        fresh
    }

    fn apply_shared(&mut self, term: &Rc<Term>) -> Rc<Term> {
        if term.occurs_free(self.var) {
            self.apply(term).into()
        } else {
            term.clone()
        }
    }

    fn apply(&mut self, term: &Term) -> Term {
        match term {
            Term::Variable(id) if *id == self.var => self.replacement.clone(),
            Term::Variable(_) => term.clone(),
            // the binder shadows the substituted variable
            Term::Abstraction(bound, _) if *bound == self.var => term.clone(),
            Term::Abstraction(_, body) if !body.occurs_free(self.var) => term.clone(),
            Term::Abstraction(bound, body) if self.free.contains(bound) => {
                let fresh = self.fresh();
                let renamed = substitute(body, *bound, &Term::Variable(fresh));
                Term::Abstraction(fresh, self.apply(&renamed).into())
            }
            Term::Abstraction(bound, body) => Term::Abstraction(*bound, self.apply_shared(body)),
            Term::Application(lhs, rhs) => {
                Term::Application(self.apply_shared(lhs), self.apply_shared(rhs))
            }
        }
    }
}

/// `term[var := replacement]`, capture-avoiding.
///
/// A binder that would capture a free variable of `replacement` is renamed
/// to an id occurring in neither `term` nor `replacement`: the one after the
/// largest id in use when there is such an id, the lowest unused one
/// otherwise. Subterms in which `var` does not occur free are shared with
/// `term`, not copied.
pub fn substitute(term: &Term, var: VarId, replacement: &Term) -> Term {
    let mut used = term.variables();
    used.extend(replacement.variables());
    used.insert(var);
    let next_fresh = used.iter().copied().max().unwrap_or(var).wrapping_add(1);
    Substitution {
        var,
        replacement,
        free: replacement.free_variables(),
        used,
        next_fresh,
    }
    .apply(term)
}

/// One leftmost-outermost beta step, or `None` if `term` has no redex.
pub fn reduce_step(term: &Term) -> Option<Term> {
    match term {
        Term::Variable(_) => None,
        Term::Abstraction(var, body) => Some(Term::Abstraction(*var, reduce_step(body)?.into())),
        Term::Application(lhs, rhs) => {
            if let Term::Abstraction(var, body) = lhs.as_ref() {
                return Some(substitute(body, *var, rhs));
            }
            if let Some(lhs) = reduce_step(lhs) {
                return Some(Term::Application(lhs.into(), rhs.clone()));
            }
            Some(Term::Application(lhs.clone(), reduce_step(rhs)?.into()))
        }
    }
}

/// Reduces for at most `max_steps` beta steps. Returns the resulting term and
/// the number of steps taken; the term is not necessarily normal when the
/// budget ran out.
pub fn normalize(term: &Term, max_steps: usize) -> (Term, usize) {
    let mut term = term.clone();
    for step in 0..max_steps {
        match reduce_step(&term) {
            Some(next) => {
                trace!("step {}: {next}", step + 1);
                term = next;
            }
            None => {
                debug!("normal form after {step} steps");
                return (term, step);
            }
        }
    }
    debug!("step budget of {max_steps} exhausted");
    (term, max_steps)
}

pub fn reduce(term: &Term, max_steps: usize) -> Term {
    normalize(term, max_steps).0
}

pub fn is_normal_form(term: &Term) -> bool {
    match term {
        Term::Variable(_) => true,
        Term::Abstraction(_, body) => is_normal_form(body),
        Term::Application(lhs, rhs) => {
            !matches!(lhs.as_ref(), Term::Abstraction(..))
                && is_normal_form(lhs)
                && is_normal_form(rhs)
        }
    }
}
