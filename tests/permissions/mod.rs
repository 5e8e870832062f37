mod cache_tests;
mod cascade_tests;
mod override_tests;
mod resolution_tests;
