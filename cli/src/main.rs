use consjs::JsRuntime;
use std::process;

#[derive(clap::Parser)]
#[command(name = "consjs", version, about = "JavaScript interpreter")]
struct Cli {
    /// Execute script text directly
    #[arg(short, long)]
    eval: Option<String>,

    /// JavaScript file to execute
    file: Option<std::path::PathBuf>,
}

fn main() {
    env_logger::init();
    let cli = <Cli as clap::Parser>::parse();

    let script = if let Some(script) = cli.eval {
        script
    } else if let Some(ref file) = cli.file {
        match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("error reading {}: {e}", file.display());
                process::exit(1);
            }
        }
    } else {
        run_repl();
        return;
    };

    let mut runtime = JsRuntime::new();
    match runtime.evaluate(&script) {
        Ok(value) => println!("{value:?}"),
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}

fn run_repl() {
    use rustyline::Editor;
    use rustyline::error::ReadlineError;

    let ver = clap::crate_version!();
    println!("consjs REPL v{ver}. Type 'exit' or Ctrl-D to quit.");

    let mut rl = match Editor::<(), rustyline::history::FileHistory>::new() {
        Ok(e) => e,
        Err(err) => {
            eprintln!("failed to initialize line editor: {err}");
            process::exit(1);
        }
    };

    let history_path = std::env::var("HOME").ok().map(|h| std::path::PathBuf::from(h).join(".consjs_history"));
    if let Some(ref p) = history_path {
        let _ = rl.load_history(p);
    }

    let mut runtime = JsRuntime::new();

    loop {
        match rl.readline("js> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed == "exit" || trimmed == ".exit" {
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.clone());
                match runtime.evaluate(&line) {
                    Ok(value) => println!("{value:?}"),
                    Err(e) => eprintln!("{e}"),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => {
                println!("Goodbye");
                break;
            }
            Err(err) => {
                eprintln!("readline error: {err}");
                break;
            }
        }
    }

    if let Some(ref p) = history_path {
        let _ = rl.save_history(p);
    }
}
