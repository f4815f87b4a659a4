pub mod chat_panel;
pub mod force_graph;
pub mod graph_panel;
pub mod health_panel;
pub mod rule_engine_panel;
pub mod settings_panel;
pub mod toast;
