pub mod local_config_files;
