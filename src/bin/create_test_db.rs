use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use storefront::{
    CategoryName, Email, NewProduct, NewUser, PasswordHash, Price, Username, ValidatedPassword,
    create_category, create_product, create_user, initialize_db,
};

/// A utility for creating a test database for the storefront server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Category names paired with (product name, price in cents, description).
const CATALOG: [(&str, [(&str, i64, &str); 3]); 3] = [
    (
        "Kitchen",
        [
            ("Kettle", 4_999, "Boils 1.7 litres in under three minutes."),
            ("Chef's Knife", 8_950, "A 20 cm stainless steel blade."),
            ("Bottle Opener", 650, "Fits in a pocket."),
        ],
    ),
    (
        "Outdoors",
        [
            ("Water Bottle", 2_499, "Keeps drinks cold for 24 hours."),
            ("Camping Chair", 5_900, "Folds flat."),
            ("Head Torch", 3_450, ""),
        ],
    ),
    (
        "Books",
        [
            ("Bread Baking Basics", 3_200, "Recipes for beginners."),
            ("Birds of the Coast", 2_750, ""),
            ("Atlas of Islands", 4_200, "Maps and short histories."),
        ],
    ),
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test user...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("test"),
        PasswordHash::DEFAULT_COST,
    )?;

    create_user(
        NewUser {
            username: Username::new_unchecked("test"),
            email: Email::new_unchecked("test@example.com"),
            password_hash,
        },
        &conn,
    )?;

    println!("Creating categories and products...");

    let now = OffsetDateTime::now_utc();
    let mut product_count: i64 = 0;

    for (category_name, products) in CATALOG {
        let category = create_category(CategoryName::new_unchecked(category_name), "", &conn)?;

        for (name, price_cents, description) in products {
            product_count += 1;

            create_product(
                NewProduct {
                    category_id: category.id,
                    name: name.to_owned(),
                    price: Price::from_cents(price_cents),
                    created: now - Duration::days(product_count),
                    available: true,
                    description: description.to_owned(),
                    image: None,
                },
                &conn,
            )?;
        }
    }

    println!("Success!");

    Ok(())
}
