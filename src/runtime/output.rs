use reshelf::pipeline::{ExecutionReport, Plan};

/// Records grouped by stage, one line each. Earlier versions of an item
/// are shown before its planned path.
pub fn print_plan(plan: &Plan) {
    if plan.is_empty() {
        println!("nothing to do");
        return;
    }
    for (index, stage) in plan.stage_names().iter().enumerate() {
        let mut records = plan.by_stage(index).peekable();
        if records.peek().is_none() {
            continue;
        }
        println!("[{stage}]");
        for rec in records {
            let chain: Vec<String> = rec
                .lineage()
                .versions()
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            println!(
                "  {:<12} {} -> {}",
                rec.op.as_str(),
                chain.join(" -> "),
                rec.planned_path.display()
            );
        }
    }
    println!("{} planned operation(s)", plan.len());
}

pub fn print_report(report: &ExecutionReport) {
    for outcome in &report.outcomes {
        match &outcome.reason {
            Some(reason) => println!(
                "{:<8} {} {}: {}",
                outcome.status.as_str(),
                outcome.op,
                outcome.source.display(),
                reason
            ),
            None => println!(
                "{:<8} {} {} -> {}",
                outcome.status.as_str(),
                outcome.op,
                outcome.source.display(),
                outcome.target.display()
            ),
        }
    }
    println!(
        "{} succeeded, {} failed, {} skipped, {} not run",
        report.succeeded, report.failed, report.skipped, report.not_run
    );
}
