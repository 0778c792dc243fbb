use clap::{Parser, Subcommand};
use lexi_context::prompt::{DEFAULT_CONTEXT_LIMIT, Mode, PromptComposer};
use lexi_context::text::{DEFAULT_CHUNK_SIZE, TextChunker};
use std::fs;
use std::io::{self, Read};
use std::num::NonZeroUsize;

/// A CLI tool to chunk extracted text and preview generator prompts.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Split a text file into fixed-size chunks and print them as JSON.
    Chunk {
        /// Path to the input text file. If not provided, reads from stdin.
        #[arg(short, long)]
        input: Option<String>,

        /// Document identifier recorded on every chunk.
        #[arg(short, long, default_value = "stdin")]
        document: String,

        /// Chunk size in characters.
        #[arg(short, long, default_value_t = DEFAULT_CHUNK_SIZE)]
        size: NonZeroUsize,
    },
    /// Print the prompt that would be sent to the generator.
    Prompt {
        /// Path to a file holding the retrieved context. If not provided, reads from stdin.
        #[arg(short, long)]
        input: Option<String>,

        /// Question to append to the prompt.
        #[arg(short, long)]
        question: String,

        /// Answer mode: brief or detailed.
        #[arg(short, long, default_value = "brief")]
        mode: Mode,

        /// Maximum number of context characters to include.
        #[arg(long, default_value_t = DEFAULT_CONTEXT_LIMIT)]
        context_limit: usize,
    },
}

fn read_input(input: Option<String>) -> io::Result<String> {
    if let Some(input_path) = input {
        fs::read_to_string(input_path)
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    }
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Chunk {
            input,
            document,
            size,
        } => {
            let content = read_input(input)?;
            let chunks = TextChunker::new(size).get_chunks(&document, &content);
            let json_output = serde_json::to_string_pretty(&chunks)?;
            println!("{json_output}");
        }
        Commands::Prompt {
            input,
            question,
            mode,
            context_limit,
        } => {
            let context = read_input(input)?;
            let prompt = PromptComposer::new(context_limit).compose(&context, &question, mode);
            println!("{prompt}");
        }
    }

    Ok(())
}
