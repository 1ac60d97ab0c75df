use std::rc::Rc;

use chumsky::Parser;

pub type Identifier = Rc<String>;

/// Character offsets into the source, the unit chumsky and ariadne agree on.
pub type Span = std::ops::Range<usize>;

pub use chumsky::error::Error as _;
pub type Error<I> = chumsky::error::Simple<I, Span>;

pub trait SimpleParser<I: Clone + std::hash::Hash + Eq, O>:
    Parser<I, O, Error = Error<I>> + Clone
{
    fn refcounted(self) -> chumsky::combinator::Map<Self, fn(O) -> Rc<O>, O>
    where
        Self: Sized,
    {
        self.map(Rc::new)
    }
}
impl<I: Clone + std::hash::Hash + Eq, O, T> SimpleParser<I, O> for T where
    T: Parser<I, O, Error = Error<I>> + Clone
{
}
