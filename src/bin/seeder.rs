// Fixture data seeder: imports the JSON files under data/ or wipes the
// database. Run with a reachable DATABASE_URL, e.g.
//   cargo run --bin seeder -- import
//   cargo run --bin seeder -- destroy

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use uuid::Uuid;

use bootcamp_api::auth::hash_password;
use bootcamp_api::database::Db;
use bootcamp_api::models::course::SkillLevel;
use bootcamp_api::models::user::Role;
use bootcamp_api::stats::Recalculator;

#[derive(Parser)]
#[command(name = "seeder")]
#[command(about = "Import or destroy bootcamp directory fixture data")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = "data", help = "Directory containing the fixture JSON files")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Import users, bootcamps, courses, and reviews")]
    Import,

    #[command(about = "Delete all imported data")]
    Destroy,
}

#[derive(Debug, Deserialize)]
struct UserFixture {
    id: Uuid,
    name: String,
    email: String,
    role: Role,
    password: String,
}

#[derive(Debug, Deserialize)]
struct BootcampFixture {
    id: Uuid,
    name: String,
    description: String,
    website: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    careers: Vec<String>,
    #[serde(default)]
    housing: bool,
    #[serde(default)]
    job_assistance: bool,
    #[serde(default)]
    job_guarantee: bool,
    #[serde(default)]
    accept_gi: bool,
    user_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct CourseFixture {
    id: Uuid,
    title: String,
    description: String,
    weeks: String,
    tuition: f64,
    minimum_skill: SkillLevel,
    #[serde(default)]
    scholarship_available: bool,
    bootcamp_id: Uuid,
    user_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ReviewFixture {
    id: Uuid,
    title: String,
    body: String,
    rating: i32,
    bootcamp_id: Uuid,
    user_id: Uuid,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let db = Db::connect().await.context("connecting to database")?;
    db.migrate().await.context("applying migrations")?;

    match cli.command {
        Commands::Import => import(&db, &cli.data_dir).await?,
        Commands::Destroy => destroy(&db).await?,
    }

    db.close().await;
    Ok(())
}

async fn import(db: &Db, data_dir: &Path) -> Result<()> {
    let users: Vec<UserFixture> = load(data_dir, "users.json")?;
    let bootcamps: Vec<BootcampFixture> = load(data_dir, "bootcamps.json")?;
    let courses: Vec<CourseFixture> = load(data_dir, "courses.json")?;
    let reviews: Vec<ReviewFixture> = load(data_dir, "reviews.json")?;

    for user in &users {
        let password_hash = hash_password(&user.password)
            .map_err(|e| anyhow::anyhow!("hashing password for {}: {}", user.email, e))?;
        sqlx::query(
            "INSERT INTO users (id, name, email, role, password_hash) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role)
        .bind(&password_hash)
        .execute(db.pool())
        .await
        .with_context(|| format!("inserting user {}", user.email))?;
    }
    println!("Imported {} users", users.len());

    for bootcamp in &bootcamps {
        sqlx::query(
            r#"
            INSERT INTO bootcamps
                (id, name, slug, description, website, phone, email, address,
                 latitude, longitude, careers, housing, job_assistance,
                 job_guarantee, accept_gi, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(bootcamp.id)
        .bind(&bootcamp.name)
        .bind(bootcamp_api::models::bootcamp::slugify(&bootcamp.name))
        .bind(&bootcamp.description)
        .bind(&bootcamp.website)
        .bind(&bootcamp.phone)
        .bind(&bootcamp.email)
        .bind(&bootcamp.address)
        .bind(bootcamp.latitude)
        .bind(bootcamp.longitude)
        .bind(&bootcamp.careers)
        .bind(bootcamp.housing)
        .bind(bootcamp.job_assistance)
        .bind(bootcamp.job_guarantee)
        .bind(bootcamp.accept_gi)
        .bind(bootcamp.user_id)
        .execute(db.pool())
        .await
        .with_context(|| format!("inserting bootcamp {}", bootcamp.name))?;
    }
    println!("Imported {} bootcamps", bootcamps.len());

    for course in &courses {
        sqlx::query(
            r#"
            INSERT INTO courses
                (id, title, description, weeks, tuition, minimum_skill,
                 scholarship_available, bootcamp_id, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(course.id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.weeks)
        .bind(course.tuition)
        .bind(course.minimum_skill)
        .bind(course.scholarship_available)
        .bind(course.bootcamp_id)
        .bind(course.user_id)
        .execute(db.pool())
        .await
        .with_context(|| format!("inserting course {}", course.title))?;
    }
    println!("Imported {} courses", courses.len());

    for review in &reviews {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, title, body, rating, bootcamp_id, user_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, now()))
            "#,
        )
        .bind(review.id)
        .bind(&review.title)
        .bind(&review.body)
        .bind(review.rating)
        .bind(review.bootcamp_id)
        .bind(review.user_id)
        .bind(review.created_at)
        .execute(db.pool())
        .await
        .with_context(|| format!("inserting review {}", review.title))?;
    }
    println!("Imported {} reviews", reviews.len());

    // Bring the derived fields in line with the imported children
    let stats = Recalculator::new(db.clone());
    for bootcamp in &bootcamps {
        stats.recalculate_cost(bootcamp.id).await;
        stats.recalculate_rating(bootcamp.id).await;
    }
    println!("Recalculated aggregates for {} bootcamps", bootcamps.len());

    Ok(())
}

async fn destroy(db: &Db) -> Result<()> {
    sqlx::query("TRUNCATE reviews, courses, bootcamps, users CASCADE")
        .execute(db.pool())
        .await
        .context("truncating tables")?;
    println!("All data destroyed");
    Ok(())
}

fn load<T: serde::de::DeserializeOwned>(data_dir: &Path, file: &str) -> Result<Vec<T>> {
    let path = data_dir.join(file);
    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}
