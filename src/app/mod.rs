// Application surfaces built on top of core: the HTTP front end.

pub mod server;
