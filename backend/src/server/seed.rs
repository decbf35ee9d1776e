//! Startup seeding of example users and packages.

use chrono::{TimeDelta, Utc};
use std::collections::BTreeSet;
use tracing::info;

use crate::domain::ports::{PackageRepository, UserRepository};
use crate::domain::{
    Email, Error, Package, PackageId, PackageState, Role, User, UserId,
};

use super::Stores;

fn seed_user(name: &str, last_name: &str, email: &str, roles: BTreeSet<Role>) -> Result<User, Error> {
    Ok(User {
        id: UserId::random(),
        name: name.to_owned(),
        last_name: last_name.to_owned(),
        email: Email::new(email)?,
        password_hash: "seed".to_owned(),
        roles,
        active: true,
        points: 0,
        consecutive_deliveries: 0,
        assigned_packages: Vec::new(),
        lockout: None,
        revision: 1,
    })
}

fn seed_package(description: &str, address: &str, weight_grams: u32) -> Package {
    Package {
        id: PackageId::random(),
        description: description.to_owned(),
        address: address.to_owned(),
        weight_grams,
        delivery_date: Utc::now() + TimeDelta::days(1),
        state: PackageState::Available,
        delivery_man: None,
        revision: 1,
    }
}

/// Insert a small development data set: one administrator, two couriers, and
/// a handful of packages.
///
/// The first courier starts with one package already assigned, because the
/// interactive assignment flow requires a non-empty assignment list on the
/// target user.
pub async fn seed_example_data(stores: &Stores) -> Result<(), Error> {
    let admin = seed_user(
        "Olu",
        "Adeyemi",
        "admin@example.com",
        BTreeSet::from([Role::Admin]),
    )?;
    let mut courier = seed_user(
        "Mara",
        "Lindqvist",
        "mara@example.com",
        BTreeSet::from([Role::Delivery]),
    )?;
    let second_courier = seed_user(
        "Ivan",
        "Petrov",
        "ivan@example.com",
        BTreeSet::from([Role::Delivery]),
    )?;

    let mut primed = seed_package("Spare parts", "14 Harbour Street", 2_400);
    primed.state = PackageState::Pending;
    primed.delivery_man = Some(courier.id);
    courier.assigned_packages.push(primed.id);

    for user in [&admin, &courier, &second_courier] {
        stores
            .users
            .insert(user)
            .await
            .map_err(|err| Error::internal(format!("seed user failed: {err}")))?;
    }
    let available = [
        seed_package("Office chairs", "2 Canal Walk", 18_000),
        seed_package("Lab glassware", "77 King's Road", 3_150),
        primed,
    ];
    for package in &available {
        stores
            .packages
            .insert(package)
            .await
            .map_err(|err| Error::internal(format!("seed package failed: {err}")))?;
    }

    info!(
        users = 3,
        packages = available.len(),
        "example data seeded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeding_primes_one_courier_with_an_assignment() {
        let stores = Stores::new();
        seed_example_data(&stores).await.expect("seeded");

        let holders = stores
            .users
            .find_with_assigned_packages()
            .await
            .expect("holders");
        assert_eq!(holders.len(), 1);
        let assigned = stores
            .packages
            .find_all_with_delivery_man()
            .await
            .expect("assigned");
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].state, PackageState::Pending);
    }
}
