//! `hw checkout`.

use clap::Args;
use hearthwood_core::PaymentMethod;
use hearthwood_storefront::checkout::{CheckoutForm, CheckoutSource, CheckoutState};
use hearthwood_storefront::{AppError, Redirect, Result, Storefront};
use secrecy::SecretString;

use super::print_items;

/// Checkout form fields. Account fields are only needed when not logged in.
#[derive(Args)]
pub struct CheckoutArgs {
    /// Username for the new account (guests)
    #[arg(short, long, default_value = "")]
    username: String,

    /// Password for the new account (guests)
    #[arg(short, long, default_value = "")]
    password: String,

    #[arg(long, default_value = "")]
    full_name: String,

    #[arg(long, default_value = "")]
    email: String,

    #[arg(long, default_value = "")]
    phone: String,

    /// Shipping address
    #[arg(short, long = "address", default_value = "")]
    shipping_address: String,
}

impl From<CheckoutArgs> for CheckoutForm {
    fn from(args: CheckoutArgs) -> Self {
        Self {
            username: args.username,
            password: SecretString::from(args.password),
            full_name: args.full_name,
            email: args.email,
            phone: args.phone,
            shipping_address: args.shipping_address,
        }
    }
}

/// Mount the checkout page, show the summary and submit.
#[allow(clippy::print_stdout)]
pub async fn run(app: &Storefront, args: CheckoutArgs) -> Result<()> {
    let mut page = app.checkout_page();

    if page.source() == CheckoutSource::RawCart {
        println!("No checkout snapshot found; using the raw cart. Run `hw cart checkout` for full details.");
    }
    println!("Order summary (payment: {}):", PaymentMethod::default());
    print_items(&page.summary().items, page.summary().item_count, page.summary().total);

    let form = CheckoutForm::from(args);
    match page.submit(&form).await {
        CheckoutState::Succeeded {
            redirect,
            confirmation,
        } => {
            match confirmation.order_id {
                Some(id) => println!("Order #{id} placed"),
                None => println!("Order placed"),
            }
            println!("Payment method: {}", PaymentMethod::default());
            if *redirect == Redirect::Login {
                println!("Your account was created. Log in with `hw login` to follow your order.");
            } else {
                println!("See your orders with `hw orders list`.");
            }
            Ok(())
        }
        CheckoutState::Failed { message, redirect } => Err(AppError::Checkout {
            message: message.clone(),
            redirect: *redirect,
        }),
        state => {
            tracing::warn!(?state, "Checkout ended without a result");
            Ok(())
        }
    }
}
