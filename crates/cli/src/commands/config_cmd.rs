//! `wordtutor config`: print a default config file.

use wordtutor_config::AppConfig;

pub fn run() {
    println!("# wordtutor configuration");
    println!("# Save as {}", AppConfig::config_dir().join("config.toml").display());
    println!("# BASE_URL, MODEL_API_KEY and MODEL_NAME in the environment override [model].");
    println!();
    print!("{}", AppConfig::default_toml());
}
