//! Navigation logic: listing sort order ([`sort`]) and the mapping between
//! routes and logical paths ([`route`]).

pub mod route;
pub mod sort;
