pub mod github_key_source;
