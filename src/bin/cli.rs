//! PolliLib demo CLI.
//!
//! Run with: cargo run --bin pollilib -- <command> [args]
//!
//! Commands: text, stream, image, models, tts, tools

use std::env;

use pollilib::{
    ChatOptions, ClientConfig, FunctionCalling, ImageGenerator, ImageRequest, MessageBuilder,
    ModelCatalog, PollinationsClient, SpeechSynthesizer, TextGenerator, TextRequest, TextStreamer,
    Voice,
};

fn usage() -> ! {
    eprintln!("Usage: pollilib <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  text <prompt>            single-turn text generation");
    eprintln!("  stream <prompt>          streaming chat, printed as it arrives");
    eprintln!("  image <prompt> [path]    generate an image, optionally save it");
    eprintln!("  models [text|image]      list available models");
    eprintln!("  tts <text> [voice]       generate speech (default voice: nova)");
    eprintln!("  tools <prompt>           chat with function calling enabled");
    eprintln!();
    eprintln!("Environment: POLLINATIONS_REFERRER, POLLINATIONS_TOKEN");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("");
    let client = PollinationsClient::new(ClientConfig::from_env());

    match command {
        "text" => {
            let prompt = args.get(2).unwrap_or_else(|| usage());
            let text = TextGenerator::new(client);
            let answer = text.generate(&TextRequest::new(prompt)).await?;
            println!("{answer}");
        }
        "stream" => {
            let prompt = args.get(2).unwrap_or_else(|| usage());
            let streamer = TextStreamer::new(client);
            let mut stream = streamer
                .stream_prompt(prompt, &ChatOptions::default())
                .await?;
            use std::io::Write;
            while let Some(chunk) = stream.next_chunk().await? {
                print!("{chunk}");
                std::io::stdout().flush()?;
            }
            println!();
        }
        "image" => {
            let prompt = args.get(2).unwrap_or_else(|| usage());
            let generator = ImageGenerator::new(client);
            let image = generator.generate(&ImageRequest::new(prompt)).await?;
            println!(
                "generated {} bytes in {:.2}s",
                image.size_bytes(),
                image.inference_time.as_secs_f64()
            );
            if let Some(path) = args.get(3) {
                let written = image.save(path).await?;
                println!("saved to {}", written.display());
            }
        }
        "models" => {
            let catalog = ModelCatalog::new(client);
            let which = args.get(2).map(String::as_str).unwrap_or("text");
            match which {
                "image" => {
                    for model in catalog.image_models().await? {
                        println!(
                            "{}  {}x{}  img2img={}",
                            model.name, model.max_width, model.max_height, model.supports_img2img
                        );
                    }
                }
                _ => {
                    for model in catalog.text_models().await? {
                        println!(
                            "{}  vision={} audio={} tools={}",
                            model.name, model.vision, model.audio, model.tool_use
                        );
                    }
                }
            }
        }
        "tts" => {
            let text = args.get(2).unwrap_or_else(|| usage());
            let voice: Voice = args
                .get(3)
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or_default();
            let synth = SpeechSynthesizer::new(client);
            let audio = synth.generate(text, voice).await?;
            let written = audio.save(format!("{}_speech", voice.as_str())).await?;
            println!(
                "{} ({}) -> {} ({} bytes)",
                voice.as_str(),
                voice.description(),
                written.display(),
                audio.size_bytes()
            );
        }
        "tools" => {
            let prompt = args.get(2).unwrap_or_else(|| usage());
            let calling = FunctionCalling::new(client);
            let messages = vec![MessageBuilder::user(prompt)];
            let result = calling.run(&messages, &ChatOptions::default()).await?;
            if !result.tools_used.is_empty() {
                println!("[tools used: {}]", result.tools_used.join(", "));
            }
            println!("{}", result.content);
        }
        _ => usage(),
    }

    Ok(())
}
