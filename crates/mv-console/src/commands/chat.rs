//! Interactive RAG chat.
//!
//! Each question is answered in two phases: the streaming endpoint paints
//! the answer as it is generated, then the complete response supplies
//! sources and model attribution. When nothing was streamed (endpoint down,
//! early error), the complete answer is printed instead.

use std::io::Write;

use clap::Args;
use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};

use mv_client::{ChatEntry, WsClient, WsConfig};
use mv_protocol::rest::{ChatHistoryEntry, ChatRequest};
use mv_protocol::ws::MessageType;

use crate::Ctx;

#[derive(Args)]
pub struct ChatArgs {
    /// Ask a single question instead of starting a session
    pub question: Option<String>,
    #[arg(long)]
    pub provider: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    /// Restrict retrieval to specific archives
    #[arg(long = "file")]
    pub pst_file_ids: Vec<String>,
    #[arg(long)]
    pub top_k: Option<u32>,
}

pub async fn run(ctx: &Ctx, args: ChatArgs) -> anyhow::Result<()> {
    let mut history: Vec<ChatHistoryEntry> = Vec::new();

    if let Some(question) = &args.question {
        ask(ctx, &args, &mut history, question).await?;
        return Ok(());
    }

    println!("MailVault chat — empty line or Ctrl-D to leave");

    // Server notifications (reindex finished, provider changes) arrive on
    // the event channel while the session is open.
    let events = WsClient::new(WsConfig::from_config(&ctx.config), ctx.tokens.clone());
    let _notifications = events.on(MessageType::Notification, |msg| {
        if let Some(text) = msg.data.get("message").and_then(|v| v.as_str()) {
            eprintln!("[server] {text}");
        }
        Ok(())
    });
    events.connect();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            break;
        }
        if let Err(e) = ask(ctx, &args, &mut history, question).await {
            eprintln!("chat failed: {e}");
        }
    }
    events.disconnect();
    Ok(())
}

async fn ask(
    ctx: &Ctx,
    args: &ChatArgs,
    history: &mut Vec<ChatHistoryEntry>,
    question: &str,
) -> anyhow::Result<()> {
    let request = ChatRequest {
        question: question.to_string(),
        chat_history: (!history.is_empty()).then(|| history.clone()),
        pst_file_ids: (!args.pst_file_ids.is_empty()).then(|| args.pst_file_ids.clone()),
        provider: args.provider.clone(),
        model: args.model.clone(),
        top_k: args.top_k,
        include_sources: Some(true),
        ..Default::default()
    };

    let mut entry = ChatEntry::assistant_placeholder();
    match ctx.api.chat_stream(&request).await {
        Ok(mut stream) => {
            while let Some(delta) = stream.next().await {
                match delta {
                    Ok(text) => {
                        print!("{text}");
                        std::io::stdout().flush()?;
                        entry.append_delta(&text);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "answer stream broke, falling back");
                        break;
                    }
                }
            }
            println!();
        }
        Err(e) => tracing::warn!(error = %e, "streaming endpoint unavailable"),
    }

    let streamed_nothing = entry.content.is_empty();
    let response = ctx.api.chat(&request).await?;
    entry.finalize(&response);

    if streamed_nothing {
        println!("{}", entry.content);
    }
    if !entry.sources.is_empty() {
        println!();
        println!("Sources:");
        for source in &entry.sources {
            println!(
                "  [{:.2}] {} — {} ({})",
                source.relevance_score, source.subject, source.sender, source.date
            );
        }
    }
    if let Some(model) = &entry.model_used {
        println!("({model}, {} tokens)", response.total_tokens);
    }

    history.push(ChatHistoryEntry {
        role: "user".to_string(),
        content: question.to_string(),
    });
    history.push(ChatHistoryEntry {
        role: "assistant".to_string(),
        content: entry.content.clone(),
    });
    Ok(())
}
