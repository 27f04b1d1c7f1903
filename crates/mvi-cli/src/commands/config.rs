use mvi_core::MviConfig;

pub fn run() {
    match serde_json::to_string_pretty(&MviConfig::default()) {
        Ok(json) => println!("{json}"),
        Err(e) => super::fail(e),
    }
}
