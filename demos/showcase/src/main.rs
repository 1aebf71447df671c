//! Showcase: configuration, attach aliasing and an entry point, wired
//! through the declarative graph.

use std::convert::Infallible;

use serde_json::{json, Value};

use lattice_di::{attach, depends, entry_point, once, Composer, DiError, NodeContext};

struct Logger;

impl Logger {
    fn log(&self, message: &str) {
        println!("> {message}");
    }
}

async fn run() -> Result<(), DiError> {
    let mut composer = Composer::new();

    composer.config(json!({
        "dog": {
            "play": { "toy": "squeaker" },
            "eat": { "food": "treat" },
            "sleep": "wherever",
        },
    }))?;

    composer.add(
        "log",
        [once(|_ctx: NodeContext| async {
            Ok::<_, Infallible>(Logger)
        })],
    )?;
    composer.add(
        "app",
        [
            once(|ctx: NodeContext| async move {
                let log = ctx.injected().get::<Logger>("log")?;
                let toy = ctx.injected().get::<Value>("toy")?;
                log.log(&format!(
                    "doggo toy is a '{}'",
                    toy.as_str().unwrap_or("?")
                ));
                Ok::<_, lattice_di::ResolveError>("this is the application".to_string())
            }),
            attach(["log", "$toy=dog.play.toy"]),
        ],
    )?;
    composer.add("start", [entry_point(), depends(["app"])])?;

    composer.run().await
}

fn main() {
    tracing_subscriber::fmt::init();

    println!("> start");
    match futures::executor::block_on(run()) {
        Ok(()) => println!("> end"),
        Err(error) => eprintln!("> ended with error: {error}"),
    }
}
