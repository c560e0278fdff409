//! Command runners

use crate::documents::{load_document, load_documents};
use anyhow::Result;
use counsel_agent::{AgentContext, CancelHandle, ConversationSession, DocumentDrafter, ResearchAggregator};
use counsel_foundation::{Error, ReferenceDocument};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

// ============================================================================
// Interrupts
// ============================================================================

/// Drive `work` to completion, cancelling its in-flight calls on each interrupt.
///
/// Only interrupts that arrive while `work` runs are consumed here. If the
/// listener cannot be installed, `work` simply runs on.
async fn cancel_on_interrupt<T, I, IFut>(
    handle: &CancelHandle,
    work: impl Future<Output = T>,
    mut interrupt: I,
) -> T
where
    I: FnMut() -> IFut,
    IFut: Future<Output = io::Result<()>>,
{
    tokio::pin!(work);
    loop {
        tokio::select! {
            biased;
            output = &mut work => return output,
            signal = interrupt() => match signal {
                Ok(()) => {
                    eprintln!("\n^C cancelling...");
                    handle.cancel_in_flight();
                }
                Err(e) => {
                    warn!("Ctrl-C listener unavailable: {}", e);
                    return work.await;
                }
            },
        }
    }
}

/// Next input line, or `None` on end of input or an interrupt at the prompt
async fn read_input(
    read: impl Future<Output = io::Result<Option<String>>>,
    interrupt: impl Future<Output = io::Result<()>>,
) -> io::Result<Option<String>> {
    tokio::pin!(read);
    tokio::select! {
        line = &mut read => line,
        signal = interrupt => match signal {
            Ok(()) => Ok(None),
            Err(_) => read.await,
        },
    }
}

// ============================================================================
// research
// ============================================================================

pub async fn research(ctx: AgentContext, query: &str, json: bool) -> Result<()> {
    let aggregator = ResearchAggregator::new(ctx);

    eprintln!("Researching...");
    let result = cancel_on_interrupt(
        &aggregator.cancel_handle(),
        aggregator.research(query),
        tokio::signal::ctrl_c,
    )
    .await;

    let report = match result {
        Ok(report) => report,
        Err(Error::Cancelled) => {
            eprintln!("Research cancelled.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", report.text);
    if !report.sources.is_empty() {
        println!("\nSources:");
        for (i, source) in report.sources.iter().enumerate() {
            println!("  [{}] {} - {}", i + 1, source.title, source.uri);
        }
    }
    Ok(())
}

// ============================================================================
// draft
// ============================================================================

pub async fn draft(ctx: AgentContext, instructions: &str, docs: &[PathBuf]) -> Result<()> {
    let documents = load_documents(docs).await?;
    let drafter = DocumentDrafter::new(ctx);

    eprintln!("Drafting with {} reference document(s)...", documents.len());
    let result = cancel_on_interrupt(
        &drafter.cancel_handle(),
        drafter.draft(instructions, &documents),
        tokio::signal::ctrl_c,
    )
    .await;

    match result {
        Ok(text) => println!("{}", text),
        Err(Error::Cancelled) => eprintln!("Drafting cancelled."),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

// ============================================================================
// chat
// ============================================================================

const CHAT_HELP: &str = "Commands: /doc PATH (attach to next message), /clear, /exit. \
Ctrl-C cancels a pending reply, or exits at the prompt.";

pub async fn chat(ctx: AgentContext, docs: &[PathBuf]) -> Result<()> {
    let mut pending: Vec<ReferenceDocument> = load_documents(docs).await?;
    let mut session = ConversationSession::new(ctx);
    let cancel = session.cancel_handle();

    println!("Counsel chat. {}", CHAT_HELP);
    if !pending.is_empty() {
        println!("{} document(s) will be attached to your first message.", pending.len());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = read_input(lines.next_line(), tokio::signal::ctrl_c()).await? else {
            println!();
            break;
        };
        let input = line.trim();

        match input {
            "" => continue,
            "/exit" | "/quit" => break,
            "/help" => {
                println!("{}", CHAT_HELP);
                continue;
            }
            "/clear" => {
                session.clear();
                println!("History cleared.");
                continue;
            }
            _ => {}
        }

        if let Some(path) = input.strip_prefix("/doc ") {
            match load_document(Path::new(path.trim())).await {
                Ok(doc) => {
                    println!("Attached {} ({}).", doc.name, doc.mime_type);
                    pending.push(doc);
                }
                Err(e) => warn!("{:#}", e),
            }
            continue;
        }

        let documents = std::mem::take(&mut pending);
        let reply =
            cancel_on_interrupt(&cancel, session.send(input, &documents), tokio::signal::ctrl_c)
                .await;
        println!("\n{}", reply);
    }

    Ok(())
}
