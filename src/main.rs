use std::io::{self, BufRead, Read, Write};
use std::path::Path;

use anyhow::{Result, anyhow};
use clap::Parser;

use lingualens::languages::{LanguageRegistry, Tone};
use lingualens::session::Session;
use lingualens::settings::Settings;
use lingualens::speech::CommandSpeech;
use lingualens::{ProviderImpl, TranslateOptions, Translator};

#[derive(Parser, Debug)]
#[command(
    name = "lingualens",
    version,
    about = "Contextual translation with idiom highlighting and spoken playback"
)]
struct Cli {
    /// Target language (default: en)
    #[arg(short = 'l', long = "lang", default_value = "en")]
    lang: String,

    /// Tone of voice: formal, slang, or colloquial
    #[arg(short = 't', long = "tone", default_value = "formal")]
    tone: String,

    /// Model name or provider:model (e.g. openai:MODEL_ID)
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// API key (overrides environment variables)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Speak the translation aloud after printing it
    #[arg(short = 's', long = "speak")]
    speak: bool,

    /// Append detected idioms to the output
    #[arg(long = "with-idioms")]
    with_idioms: bool,

    /// Append alternative phrasings to the output
    #[arg(long = "with-alternatives")]
    with_alternatives: bool,

    /// Append token usage to output
    #[arg(long = "with-using-tokens")]
    with_using_tokens: bool,

    /// Append model name to output
    #[arg(long = "with-using-model")]
    with_using_model: bool,

    /// Show enabled translation languages and exit
    #[arg(long = "show-enabled-languages")]
    show_enabled_languages: bool,

    /// Show tone keys with their guidance and exit
    #[arg(long = "show-enabled-tones")]
    show_enabled_tones: bool,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Run the HTTP API server
    #[arg(long = "serve")]
    serve: bool,

    /// Serve the browser client page
    #[arg(long = "client")]
    client: bool,

    /// Bind address override for --serve/--client
    #[arg(long = "addr")]
    addr: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,

    /// Interactive mode
    #[arg(short = 'i', long = "interactive")]
    interactive: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    lingualens::logging::init(cli.verbose)?;

    if cli.serve || cli.client {
        let settings_path = cli.read_settings.as_deref().map(Path::new);
        let settings = lingualens::settings::load_settings(settings_path)?;
        if cli.serve {
            let addr = cli
                .addr
                .clone()
                .unwrap_or_else(|| settings.server_addr.clone());
            return lingualens::server::run_server(settings, addr).await;
        }
        let addr = cli
            .addr
            .clone()
            .unwrap_or_else(|| settings.client_addr.clone());
        let api_base = format!("http://{}", settings.server_addr);
        return lingualens::server::run_client(addr, api_base).await;
    }

    if cli.interactive {
        return run_interactive(cli).await;
    }

    let needs_input = !(cli.show_enabled_languages || cli.show_enabled_tones);
    let input = if needs_input {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Some(buffer)
    } else {
        None
    };

    let output = lingualens::run(config_from_cli(&cli), input).await?;
    println!("{}", output);
    Ok(())
}

fn config_from_cli(cli: &Cli) -> lingualens::Config {
    lingualens::Config {
        lang: cli.lang.clone(),
        tone: cli.tone.clone(),
        model: cli.model.clone(),
        key: cli.key.clone(),
        speak: cli.speak,
        settings_path: cli.read_settings.clone(),
        show_enabled_languages: cli.show_enabled_languages,
        show_enabled_tones: cli.show_enabled_tones,
        with_idioms: cli.with_idioms,
        with_alternatives: cli.with_alternatives,
        with_using_tokens: cli.with_using_tokens,
        with_using_model: cli.with_using_model,
    }
}

struct InteractiveState {
    config: lingualens::Config,
    settings: Settings,
    registry: LanguageRegistry,
    session: Session<CommandSpeech>,
}

async fn run_interactive(cli: Cli) -> Result<()> {
    let settings_path = cli.read_settings.as_deref().map(Path::new);
    let settings = lingualens::settings::load_settings(settings_path)?;
    let registry = LanguageRegistry::load()?;
    let platform = CommandSpeech::with_preference(&settings.speech_engine);
    let session = Session::new(registry.clone(), platform);
    let mut state = InteractiveState {
        config: config_from_cli(&cli),
        settings,
        registry,
        session,
    };

    println!("Interactive mode. Use /quit or /exit to finish.");
    println!("Type /help to see available commands.");
    if !state.session.speech_available() {
        println!("note: no speech engine found; /speak is unavailable");
    }

    let mut line = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();
    loop {
        state.session.pump_playback();
        line.clear();
        print!("> ");
        io::stdout().flush()?;
        if stdin_lock.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.starts_with('/') {
            if handle_interactive_command(input, &mut state).await? {
                break;
            }
            continue;
        }

        submit_interactive(&mut state, input).await;
    }
    Ok(())
}

async fn submit_interactive(state: &mut InteractiveState, input: &str) {
    let tone: Tone = match state.config.tone.parse() {
        Ok(tone) => tone,
        Err(err) => {
            eprintln!("{}", err);
            return;
        }
    };
    if !state.registry.is_valid_code(&state.config.lang) {
        eprintln!(
            "invalid target language code '{}' (see /show-enabled-languages)",
            state.config.lang
        );
        return;
    }
    let translator = match build_translator(&state.config, &state.settings) {
        Ok(translator) => translator,
        Err(err) => {
            eprintln!("{}", err);
            return;
        }
    };
    let options = TranslateOptions {
        lang: state.config.lang.clone(),
        tone,
    };
    match state.session.submit(&translator, input, options).await {
        Ok(_) => print_interactive_result(state),
        Err(_) => {
            if let Some(message) = state.session.error_message() {
                eprintln!("{}", message);
            }
        }
    }
}

fn build_translator(
    config: &lingualens::Config,
    settings: &Settings,
) -> Result<Translator<ProviderImpl>> {
    lingualens::build_translator(config.model.as_deref(), config.key.as_deref(), settings)
}

fn print_interactive_result(state: &InteractiveState) {
    let segments = state.session.segments();
    println!("{}", lingualens::render_segments(&segments));
    let Some(result) = state.session.result() else {
        return;
    };
    if state.config.with_idioms && !result.idioms.is_empty() {
        println!("idioms: {}", result.idioms.join(", "));
    }
    if state.config.with_alternatives && !result.alternative_translations.is_empty() {
        println!("alternatives:");
        for alternative in &result.alternative_translations {
            println!("  - {}", alternative);
        }
    }
}

async fn handle_interactive_command(input: &str, state: &mut InteractiveState) -> Result<bool> {
    let trimmed = input.trim();
    if matches!(trimmed, "/quit" | "/exit") {
        return Ok(true);
    }
    if trimmed == "/help" {
        print_interactive_help();
        return Ok(false);
    }
    if trimmed == "/speak" {
        state.session.pump_playback();
        if let Err(err) = state.session.speak() {
            eprintln!("{}", err);
        }
        return Ok(false);
    }
    if trimmed == "/stop" {
        state.session.pump_playback();
        state.session.stop_speaking();
        return Ok(false);
    }
    if trimmed == "/idioms" {
        match state.session.result() {
            Some(result) if !result.idioms.is_empty() => {
                println!("idioms: {}", result.idioms.join(", "));
            }
            Some(_) => println!("no idioms detected"),
            None => println!("no translation yet"),
        }
        return Ok(false);
    }
    if trimmed == "/alternatives" {
        match state.session.result() {
            Some(result) if !result.alternative_translations.is_empty() => {
                for alternative in &result.alternative_translations {
                    println!("  - {}", alternative);
                }
            }
            Some(_) => println!("no alternative phrasings"),
            None => println!("no translation yet"),
        }
        return Ok(false);
    }
    if trimmed == "/show-enabled-languages" {
        let mut config = state.config.clone();
        config.show_enabled_languages = true;
        let output = lingualens::run(config, None).await?;
        println!("{}", output);
        return Ok(false);
    }
    if trimmed == "/show-enabled-tones" {
        let mut config = state.config.clone();
        config.show_enabled_tones = true;
        let output = lingualens::run(config, None).await?;
        println!("{}", output);
        return Ok(false);
    }

    if let Some(arg) = trimmed.strip_prefix("/lang") {
        let value = arg.trim();
        if value.is_empty() {
            println!("lang: {}", state.config.lang);
        } else if !state.registry.is_valid_code(value) {
            eprintln!("invalid target language code '{}'", value);
        } else {
            state.config.lang = value.to_string();
            println!("lang set to {}", value);
        }
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/tone") {
        let value = arg.trim();
        if value.is_empty() {
            println!("tone: {}", state.config.tone);
        } else {
            match value.parse::<Tone>() {
                Ok(tone) => {
                    state.config.tone = tone.as_str().to_string();
                    println!("tone set to {}", tone.as_str());
                }
                Err(err) => eprintln!("{}", err),
            }
        }
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/model") {
        let value = arg.trim();
        if value.is_empty() {
            println!(
                "model: {}",
                state.config.model.as_deref().unwrap_or("(auto)")
            );
        } else {
            state.config.model = Some(value.to_string());
            println!("model set to {}", value);
        }
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/key") {
        let value = arg.trim();
        if value.is_empty() {
            println!(
                "key: {}",
                state
                    .config
                    .key
                    .as_deref()
                    .map(|_| "(set)")
                    .unwrap_or("(none)")
            );
        } else {
            state.config.key = Some(value.to_string());
            println!("key set");
        }
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/with-idioms") {
        state.config.with_idioms = parse_toggle(arg, state.config.with_idioms)?;
        println!("with-idioms: {}", state.config.with_idioms);
        return Ok(false);
    }
    if let Some(arg) = trimmed.strip_prefix("/with-alternatives") {
        state.config.with_alternatives = parse_toggle(arg, state.config.with_alternatives)?;
        println!("with-alternatives: {}", state.config.with_alternatives);
        return Ok(false);
    }

    eprintln!("unknown command: {}", trimmed);
    Ok(false)
}

fn parse_toggle(arg: &str, current: bool) -> Result<bool> {
    let value = arg.trim();
    if value.is_empty() {
        return Ok(!current);
    }
    match value.to_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(anyhow!("expected on/off/true/false/1/0")),
    }
}

fn print_interactive_help() {
    println!("Commands:");
    println!("  /quit, /exit                 Exit interactive mode");
    println!("  /speak                       Speak the current translation");
    println!("  /stop                        Stop spoken playback");
    println!("  /idioms                      Show idioms from the current result");
    println!("  /alternatives                Show alternative phrasings");
    println!("  /show-enabled-languages      Show enabled languages");
    println!("  /show-enabled-tones          Show tone keys and guidance");
    println!("  /lang <code>                 Set target language");
    println!("  /tone <formal|slang|colloquial>  Set tone");
    println!("  /model <provider:model>      Set model (or show current)");
    println!("  /key <api-key>               Set API key");
    println!("  /with-idioms [on|off]        Toggle idiom list output");
    println!("  /with-alternatives [on|off]  Toggle alternatives output");
}
