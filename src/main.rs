use chrono::Local;
use uuid::Uuid;

use giardino::models::{Category, PlantUpdate};
use giardino::{App, AppError, Config, PlantDraft, Result};

const USAGE: &str = r#"Usage: giardino <command> [args]

Commands:
  signup <email> <password>       Create an account and sign in
  signin <email> <password>       Sign in
  signout                         Sign out
  whoami                          Show the signed-in account
  add <name> <category> [days] [notes]
                                  Add a plant (categories: Indoor, Outdoor,
                                  Aromatiche, Grasse, Fiorite, Ortaggi, Alberi, Altra)
  list                            List your plants and whether they need care
  show <plant-id>                 Show a plant and its care log
  water <plant-id> [type] [notes] Log care given now (default type: water)
  edit <plant-id> [--name N] [--category C] [--every DAYS] [--image URL] [--notes TEXT]
                                  Change a plant; an empty value clears image/notes
  delete <plant-id>               Delete a plant and its care log"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let config = Config::load()?;
    let app = App::new(&config).await?;

    let result = run(&app, command, &args[1..]).await;
    app.close().await?;

    match result {
        Err(AppError::InvalidInput(msg)) => {
            eprintln!("Error: {}\n\n{}", msg, USAGE);
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        Ok(()) => Ok(()),
    }
}

async fn run(app: &App, command: &str, args: &[String]) -> Result<()> {
    match (command, args) {
        ("signup", [email, password]) => {
            let account = app.auth().sign_up(email, password).await?;
            println!("Welcome! Signed in as {}", account.email);
        }
        ("signin", [email, password]) => {
            let account = app.auth().sign_in(email, password).await?;
            println!("Welcome back, {}", account.email);
        }
        ("signout", []) => {
            app.auth().sign_out()?;
            println!("Signed out");
        }
        ("whoami", []) => match app.current_account() {
            Some(account) => println!(
                "{} (member since {})",
                account.email,
                account.created_at.with_timezone(&Local).format("%-d %B %Y")
            ),
            None => println!("Not signed in"),
        },
        ("add", [name, category, rest @ ..]) if rest.len() <= 2 => {
            let care_frequency_days = rest.first().map(|d| parse_days(d)).transpose()?;
            let plant = app
                .add_plant(PlantDraft {
                    name: name.clone(),
                    category: category.parse()?,
                    care_frequency_days,
                    image_ref: None,
                    notes: rest.get(1).cloned(),
                })
                .await?;
            println!("Added {} ({})", plant.name, plant.id);
        }
        ("list", []) => {
            let plants = app.plants().await?;
            if plants.is_empty() {
                println!("Your garden is empty. Add a plant with `giardino add`.");
            }
            for summary in plants {
                let last = summary
                    .status
                    .last_care
                    .map(|d| d.with_timezone(&Local).format("%-d %b %Y").to_string())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{}  {:<20} {:<10} every {:>2}d  last care: {:<12}{}",
                    summary.plant.id,
                    summary.plant.name,
                    summary.plant.category,
                    summary.plant.care_frequency_days,
                    last,
                    if summary.status.is_due { "  needs care" } else { "" }
                );
            }
        }
        ("show", [id]) => {
            let detail = app.plant_detail(parse_id(id)?).await?;
            let plant = &detail.plant;
            println!("{} [{}]", plant.name, plant.category);
            println!("  Care every {} days", plant.care_frequency_days);
            println!(
                "  Added {}",
                plant.created_at.with_timezone(&Local).format("%-d %B %Y")
            );
            if let Some(image) = &plant.image_ref {
                println!("  Image: {}", image);
            }
            if let Some(notes) = &plant.notes {
                println!("  Notes: {}", notes);
            }
            match detail.status.next_due {
                _ if detail.status.is_due => println!("  Needs care now"),
                Some(next) => println!(
                    "  Next care: {}",
                    next.with_timezone(&Local).format("%-d %B %Y")
                ),
                None => {}
            }
            println!("Care log:");
            if detail.care_log.is_empty() {
                println!("  (no care logged yet)");
            }
            for event in &detail.care_log {
                println!(
                    "  {}  {}{}",
                    event.care_date.with_timezone(&Local).format("%-d %b %Y %H:%M"),
                    event.care_type,
                    event
                        .notes
                        .as_ref()
                        .map(|n| format!(" - {}", n))
                        .unwrap_or_default()
                );
            }
        }
        ("water", [id, rest @ ..]) if rest.len() <= 2 => {
            let event = app
                .log_care(parse_id(id)?, rest.first().cloned(), rest.get(1).cloned())
                .await?;
            println!("Logged {} at {}", event.care_type, event.care_date.with_timezone(&Local));
        }
        ("edit", [id, flags @ ..]) => {
            let update = parse_update(flags)?;
            let plant = app.edit_plant(parse_id(id)?, update).await?;
            println!("Updated {}", plant.name);
        }
        ("delete", [id]) => {
            app.remove_plant(parse_id(id)?).await?;
            println!("Deleted");
        }
        _ => {
            return Err(AppError::InvalidInput(format!(
                "unknown command or wrong arguments: {}",
                command
            )))
        }
    }
    Ok(())
}

fn parse_id(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|_| AppError::InvalidInput(format!("not a plant id: {}", s)))
}

fn parse_days(s: &str) -> Result<u32> {
    s.parse()
        .map_err(|_| AppError::InvalidInput(format!("not a number of days: {}", s)))
}

fn parse_update(flags: &[String]) -> Result<PlantUpdate> {
    let mut update = PlantUpdate::default();
    for pair in flags.chunks(2) {
        let [flag, value] = pair else {
            return Err(AppError::InvalidInput(format!("missing value for {}", pair[0])));
        };
        let optional = (!value.trim().is_empty()).then(|| value.clone());
        match flag.as_str() {
            "--name" => update.name = Some(value.clone()),
            "--category" => update.category = Some(value.parse::<Category>()?),
            "--every" => update.care_frequency_days = Some(parse_days(value)?),
            "--image" => update.image_ref = Some(optional),
            "--notes" => update.notes = Some(optional),
            other => return Err(AppError::InvalidInput(format!("unknown option: {}", other))),
        }
    }
    Ok(update)
}
