pub mod config_patcher;
pub mod key_provisioner;
pub mod orchestrator;
