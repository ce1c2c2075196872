//! A path-template router for single-page applications.
//!
//! Routes are declared on a [`RouteTree`] with templates such as
//! `/parent/{parentId:[0-9]+}/child/{childName}`, optionally nested through
//! sub-routers and named for reverse routing. A [`Navigator`] installs the
//! tree on a [`Window`](location::Window): it intercepts anchor clicks,
//! follows history traversal, keeps history in step with the active route
//! and runs route handlers.
//!
//! ```
//! use pathway_router::{params_map, RouteTree};
//!
//! let mut tree = RouteTree::new();
//! let root = tree.root();
//! tree.new_route(root)
//!     .path("/parent/{parentId:[0-9]+}/child/{childName}")?
//!     .name("child")?;
//!
//! let uri = tree.uri("child", &params_map! { "parentId" => 123, "childName" => "sally" })?;
//! assert_eq!(uri, "/parent/123/child/sally");
//!
//! let m = tree.match_path(&uri).unwrap();
//! assert_eq!(m.params.get_str("childName"), Some("sally"));
//! # Ok::<(), pathway_router::RouteError>(())
//! ```

#![forbid(unsafe_code)]

mod controller;
mod error;
pub mod location;
mod matching;
mod navigation;
mod options;
pub mod params;
pub mod pubsub;
mod routes;
pub mod template;

pub use controller::*;
pub use error::*;
pub use matching::*;
pub use navigation::*;
pub use options::*;
pub use params::{FromModel, Model, ParamSource, ParamsMap};
pub use routes::*;
pub use template::PathTemplate;
