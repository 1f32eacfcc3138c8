use std::env;
use std::error;

use reqwest::Url;

fn main() -> Result<(), Box<dyn error::Error>> {
    let args: Vec<String> = env::args().collect();
    let url = match args.get(1) {
        Some(arg) => Url::parse(arg)?,
        None => Url::parse("http://127.0.0.1:8000/health")?,
    };

    let body = reqwest::blocking::get(url)?;
    if !body.status().is_success() {
        panic!("Request Failed!")
    }

    Ok(())
}
