use income_report_builder::*;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("📊 Income Report Demo\n");

    let rows = rows_from_json(
        r#"[
            {"subject": "1234567890", "year": 2021, "quarter": 3, "employer_id": "30001111",
             "employer_name": "Limited Liability Company North Star", "income": 15000.0, "tax": 2925.0,
             "income_type_code": "101"},
            {"subject": "1234567890", "year": 2022, "quarter": 4, "employer_id": "30001111",
             "employer_name": "Limited Liability Company North Star", "income": 18000.0, "tax": 3510.0,
             "income_type_code": "101"},
            {"subject": "1234567890", "date": "2022-05-17", "employer_id": "40002222",
             "employer_name": "Joint Stock Company Bank Dnipro", "income": 120.5, "tax": 23.5,
             "income_type_code": "126"},
            {"subject": "1234567890", "year": 2023, "quarter": 1, "employer_id": "50003333",
             "employer_name": "Private Enterprise Vesna", "income": 2500.0, "tax": 487.5,
             "income_type_code": "157"},
            {"subject": "5555555555", "year": 2023, "quarter": 7, "employer_id": "1",
             "income": 1.0, "income_type_code": "101"},
            {"subject": "7777777777", "year": 2023, "employer_id": "1",
             "income": 1.0, "income_type_code": "101"}
        ]"#,
    )?;

    let labels = LabelCatalog::from_json(
        r#"{
            "income_type_short": {"101": "Salary", "126": "Interest", "157": "Civil contract"},
            "company_forms": [
                {"phrase": "limited liability company", "abbreviation": "llc"},
                {"phrase": "joint stock company", "abbreviation": "jsc"},
                {"phrase": "private enterprise", "abbreviation": "pe"}
            ]
        }"#,
    )?;

    let options = ReportOptions {
        include_yearly_breakdown: true,
        include_income_type_breakdown: true,
        show_employer_sublist_as_text: true,
        ..Default::default()
    };

    let ingested = group_by_subject(rows);
    let outcome = process_ingested(ingested, &options, &labels);

    for report in &outcome.reports {
        let intro = &report.intro;
        println!("Subject {}", report.subject);
        println!(
            "  Period: {} .. {} ({})",
            intro.first_period, intro.last_period, intro.duration.display_text
        );
        println!(
            "  Income {} / tax {} / profit {}",
            intro.total_income, intro.total_tax, intro.total_profit
        );
        println!(
            "  Average profit: {} per year, {} per month\n",
            intro.average_yearly_profit, intro.average_monthly_profit
        );

        println!("  {}", report.pivot.headers.join(" | "));
        for row in &report.pivot.rows {
            println!(
                "  {} | {} | {} | {}",
                row.year.as_deref().unwrap_or(""),
                row.income_type.as_deref().unwrap_or(""),
                row.employer,
                row.year_total.as_deref().unwrap_or("")
            );
        }

        if let Some(pie) = report.income_types.as_ref().and_then(|t| t.pie.as_ref()) {
            println!("\n  Income types (thousands):");
            for bucket in pie {
                println!("    №{} {} - {}", bucket.rank, bucket.label, bucket.thousands_label());
            }
        }
        println!();
    }

    for (subject, error) in &outcome.failures {
        println!("⚠️  {}: {}", subject, error);
    }

    Ok(())
}
