//! `dlq shell` – interactive client.
//!
//! Reads one command per line from stdin and sends it over a single server
//! connection. The shell exits when the connection drops.

use anyhow::{Context, Result};
use dlq_core::config::ClientConfig;
use dlq_core::job::{JobId, PurgeScope};
use dlq_core::protocol::{Client, ProtocolError, Response};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};

use crate::cli::{control_socket, render};

const HELP: &str = "\
Commands
========
a URL [URL ...]    queue URLs for download
f FILE [FILE ...]  queue every URL found in the files (whitespace separated)
l                  list all jobs
s ID               show one job
c ID               cancel a queued or running job
r                  retry: queue all failed jobs again
d                  discard: remove all failed jobs
p                  purge: remove all finished jobs
shutdown           stop the server (drains running downloads)
help               show this message
q                  quit the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ShellCommand {
    Empty,
    Submit(Vec<String>),
    SubmitFiles(Vec<PathBuf>),
    List,
    Status(JobId),
    Cancel(JobId),
    Retry,
    DiscardFailed,
    Purge,
    Shutdown,
    Help,
    Quit,
}

/// Parses one input line. `Err` carries a message for the user.
pub(crate) fn parse_line(line: &str) -> Result<ShellCommand, String> {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Ok(ShellCommand::Empty);
    };
    let args: Vec<&str> = words.collect();
    let no_args = |c: ShellCommand| {
        if args.is_empty() {
            Ok(c)
        } else {
            Err(format!("{}: takes no arguments", cmd))
        }
    };
    let one_id = |make: fn(JobId) -> ShellCommand| match args.as_slice() {
        [id] => id
            .parse::<JobId>()
            .map(make)
            .map_err(|_| format!("{}: bad job id {:?}", cmd, id)),
        _ => Err(format!("{}: exactly one job id expected", cmd)),
    };

    match cmd {
        "a" if args.is_empty() => Err("a: URL expected".to_string()),
        "a" => Ok(ShellCommand::Submit(args.iter().map(|s| s.to_string()).collect())),
        "f" if args.is_empty() => Err("f: filename expected".to_string()),
        "f" => Ok(ShellCommand::SubmitFiles(args.iter().map(|s| PathBuf::from(*s)).collect())),
        "l" => no_args(ShellCommand::List),
        "s" => one_id(ShellCommand::Status),
        "c" => one_id(ShellCommand::Cancel),
        "r" => no_args(ShellCommand::Retry),
        "d" => no_args(ShellCommand::DiscardFailed),
        "p" => no_args(ShellCommand::Purge),
        "shutdown" => no_args(ShellCommand::Shutdown),
        "help" | "h" | "?" => Ok(ShellCommand::Help),
        "q" | "quit" | "exit" => Ok(ShellCommand::Quit),
        other => Err(format!("unknown command {:?}; type `help`", other)),
    }
}

enum Flow {
    Continue,
    Quit,
}

pub async fn run_shell(socket: &Path, cfg: &ClientConfig) -> Result<()> {
    let mut client = control_socket::connect(socket, cfg).await?;
    println!("Connected to {}. Type `help` for commands.", socket.display());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("dlq> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let cmd = match parse_line(&line) {
            Ok(cmd) => cmd,
            Err(msg) => {
                eprintln!("{}", msg);
                continue;
            }
        };
        match execute(&mut client, cmd).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e @ (ProtocolError::Io(_) | ProtocolError::Disconnected)) => {
                return Err(e).context("server connection lost");
            }
            Err(e) => eprintln!("{}", e),
        }
    }
    Ok(())
}

async fn execute<S>(client: &mut Client<S>, cmd: ShellCommand) -> Result<Flow, ProtocolError>
where
    S: AsyncRead + AsyncWrite,
{
    match cmd {
        ShellCommand::Empty => {}
        ShellCommand::Help => println!("{}", HELP),
        ShellCommand::Quit => return Ok(Flow::Quit),
        ShellCommand::Submit(urls) => submit_all(client, &urls).await?,
        ShellCommand::SubmitFiles(files) => {
            for file in files {
                match tokio::fs::read_to_string(&file).await {
                    Ok(text) if text.trim().is_empty() => {
                        eprintln!("file '{}' is empty", file.display())
                    }
                    Ok(text) => {
                        let urls: Vec<String> =
                            text.split_whitespace().map(str::to_string).collect();
                        submit_all(client, &urls).await?;
                    }
                    Err(e) => eprintln!("cannot read '{}': {}", file.display(), e),
                }
            }
        }
        ShellCommand::List => match client.list().await? {
            Response::Jobs { jobs } => render::print_jobs(&jobs),
            other => eprintln!("{}", render::describe(&other)),
        },
        ShellCommand::Status(id) => match client.status(id).await? {
            Response::Job { job } => render::print_job(&job),
            other => eprintln!("{}", render::describe(&other)),
        },
        ShellCommand::Cancel(id) => match client.cancel(id).await? {
            Response::Ack => println!("Cancelled job {}", id),
            other => eprintln!("{}", render::describe(&other)),
        },
        ShellCommand::Retry => match client.retry().await? {
            Response::Resubmitted { jobs } => {
                for (old, new) in &jobs {
                    println!("Job {} requeued as {}", old, new);
                }
                println!("{} failed job(s) requeued", jobs.len());
            }
            other => eprintln!("{}", render::describe(&other)),
        },
        ShellCommand::DiscardFailed => purge(client, PurgeScope::Failed).await?,
        ShellCommand::Purge => purge(client, PurgeScope::Terminal).await?,
        ShellCommand::Shutdown => match client.shutdown().await? {
            Response::Ack => {
                println!("Server stopped");
                return Ok(Flow::Quit);
            }
            other => eprintln!("{}", render::describe(&other)),
        },
    }
    Ok(Flow::Continue)
}

async fn submit_all<S>(client: &mut Client<S>, urls: &[String]) -> Result<(), ProtocolError>
where
    S: AsyncRead + AsyncWrite,
{
    for url in urls {
        match client.submit(url.as_str()).await? {
            Response::Submitted { job_id } => println!("Queued job {}: {}", job_id, url),
            other => eprintln!("{}: {}", url, render::describe(&other)),
        }
    }
    Ok(())
}

async fn purge<S>(client: &mut Client<S>, scope: PurgeScope) -> Result<(), ProtocolError>
where
    S: AsyncRead + AsyncWrite,
{
    match client.purge(scope).await? {
        Response::Purged { count } => println!("Removed {} job(s)", count),
        other => eprintln!("{}", render::describe(&other)),
    }
    Ok(())
}
