mod backend;

pub use backend::{BackendClient, MatchParams, RemoteProcedure, Table};
