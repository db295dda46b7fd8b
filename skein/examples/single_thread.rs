use skein::{Status, Thread, Values, logging, values};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_development();

    // Greets whoever it is handed, counting the greetings
    let mut greeted = 0;
    let thread = Thread::new(move |args: Values| {
        greeted += 1;
        let name = args.first().and_then(|v| v.as_str()).unwrap_or("nobody");
        values![format!("hello, {name}"), greeted]
    })?;
    println!("created {} ({})", thread.id(), thread.status()?);

    for name in ["ada", "grace", "barbara"] {
        assert!(thread.dispatch(values![name]).await?);
        if let Some(result) = thread.join(true).await? {
            println!("{result:?}");
        }
    }

    assert_eq!(thread.status()?, Status::Suspended);
    assert!(thread.destroy()?);
    Ok(())
}
