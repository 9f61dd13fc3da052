use std::io::{self, Write};

use anyhow::Result;

use crate::context::Context;
use crate::models::GenerateOptions;
use crate::pipeline::Workflow;

/// Analyzer turns before the console stops asking and plans with what it has
const MAX_TURNS: usize = 5;

fn prompt(label: &str) -> Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

pub async fn run(mut workflow: Workflow, options: GenerateOptions) -> Result<()> {
    let ctx = Context::background();

    println!("Metaforge - build an AI agent by describing it");
    println!("Describe the agent you need, or type 'exit' to quit");
    println!("Example: 'An agent that searches tech news'");

    let mut complete = false;
    for _ in 0..MAX_TURNS {
        let Some(input) = prompt("> ")? else {
            break;
        };
        if input.eq_ignore_ascii_case("exit") {
            println!("Goodbye!");
            return Ok(());
        }
        if input.is_empty() {
            if workflow.transcript().is_none() {
                eprintln!("Cannot build an agent without a description.");
                continue;
            }
            break;
        }

        match workflow.send(&ctx, &input).await {
            Ok(turn) => {
                if turn.complete {
                    println!("\n✓ {}\n", turn.reply);
                    complete = true;
                    break;
                }
                println!("\n{}\n", turn.reply);
            }
            Err(e) => eprintln!("Error [{}]: {}", e.kind(), e),
        }
    }

    if !complete {
        eprintln!("The analyzer still needs more information; nothing was generated.");
        return Ok(());
    }

    println!("Creating the agent plan...");
    let plan = match workflow.create_plan(&ctx).await {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Error creating plan: {}", e);
            return Ok(());
        }
    };

    println!("\nAgent plan:");
    for (label, value) in super::plan_summary(&plan) {
        println!("  {:<7} {}", format!("{}:", label), value);
    }

    let confirm = prompt("\nGenerate this agent? (y/n): ")?.unwrap_or_default();
    if !matches!(confirm.to_lowercase().as_str(), "y" | "yes" | "s" | "si" | "sí") {
        println!("Generation cancelled.");
        return Ok(());
    }

    match workflow.generate(&ctx, options).await {
        Ok(generated) => {
            let resp = &generated.response;
            match &generated.saved_to {
                Some(path) => println!("\n✓ Agent generated: {}", path.display()),
                None => println!("\n✓ Agent generated: {}", resp.filepath),
            }
            println!("  {} bytes, ~{} lines", resp.size_bytes, resp.lines);
            if generated.saved_to.is_some() {
                println!("\nRun it with: python {}", resp.filepath);
            } else {
                println!("\n{}", resp.code);
            }
        }
        Err(e) => eprintln!("Error generating agent: {}", e),
    }

    Ok(())
}
