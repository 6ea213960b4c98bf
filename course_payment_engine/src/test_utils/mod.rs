pub mod prepare_env;
pub mod simulated_gateway;
