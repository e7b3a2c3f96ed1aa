mod health_tests;
mod rate_limit_tests;
mod startup_tests;
