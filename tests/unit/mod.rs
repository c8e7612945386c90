mod config_health_tests;
mod diamond_graph_tests;
mod error_sink_tests;
mod ordering_property_tests;
