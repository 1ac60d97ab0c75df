macro_rules! var {
    ($id:expr) => {
        $crate::term::Term::Variable($id)
    };
}
macro_rules! lambda {
    ($x:expr, $body:expr) => {
        $crate::term::Term::Abstraction($x, ::std::rc::Rc::new($body))
    };
}
macro_rules! apply {
    ($lhs:expr, $rhs:expr) => {
        $crate::term::Term::Application(::std::rc::Rc::new($lhs), ::std::rc::Rc::new($rhs))
    };
}
