pub mod alpha_vantage;
pub mod pagination;
pub mod rest;

#[cfg(test)]
pub(crate) mod test_server;
