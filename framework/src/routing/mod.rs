mod router;

pub use router::{BoxedHandler, RouteBuilder, RouteMatch, Router};
