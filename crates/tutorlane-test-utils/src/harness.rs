// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` opens a temp SQLite ledger, seeds it with one student,
//! teacher, admin, language, slot and bundle, and carries the mock
//! collaborators so tests can assemble an engine around them.

use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;
use uuid::Uuid;

use tutorlane_config::TutorlaneConfig;
use tutorlane_core::{
    AvailabilitySlot, Booking, Bundle, Language, Payment, PaymentProvider, Principal, Referral,
    ReferralStatus, Role, SlotStatus, TeacherAccount, TutorError, User,
};
use tutorlane_storage::Database;
use tutorlane_storage::queries::{bookings, bundles, languages, payments, referrals, slots, users};

use crate::mock_gateway::MockGateway;
use crate::mock_notifier::RecordingNotifier;
use crate::mock_rates::FixedRates;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    student_credit: Decimal,
    slot_capacity: u32,
    slot_start: DateTime<Utc>,
    slot_length: Duration,
    price: Decimal,
    kes_rate: Decimal,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            student_credit: Decimal::ZERO,
            slot_capacity: 1,
            slot_start: (Utc::now() + Duration::days(1)).trunc_subsecs(0),
            slot_length: Duration::hours(1),
            price: Decimal::new(1500, 2),
            kes_rate: Decimal::new(129_025, 3),
        }
    }

    /// Opening wallet credit of the seeded student.
    pub fn with_student_credit(mut self, credit: Decimal) -> Self {
        self.student_credit = credit;
        self
    }

    pub fn with_slot_capacity(mut self, max_students: u32) -> Self {
        self.slot_capacity = max_students;
        self
    }

    /// Start time of the seeded slot; it lasts one hour.
    pub fn with_slot_start(mut self, start: DateTime<Utc>) -> Self {
        self.slot_start = start.trunc_subsecs(0);
        self
    }

    /// Price per session of the seeded language, in USD.
    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = price;
        self
    }

    pub fn with_kes_rate(mut self, rate: Decimal) -> Self {
        self.kes_rate = rate;
        self
    }

    /// Build the test harness, opening and seeding the ledger.
    pub async fn build(self) -> Result<TestHarness, TutorError> {
        let temp_dir = TempDir::new().map_err(|e| TutorError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("ledger.db").to_string_lossy().to_string();
        let db = Arc::new(Database::open(&db_path).await?);

        let student = person("Amani Student", Role::Student, self.student_credit);
        let teacher = person("Wanjiru Teacher", Role::Teacher, Decimal::ZERO);
        let admin = person("Otieno Admin", Role::Admin, Decimal::ZERO);
        let language = Language {
            id: Uuid::new_v4(),
            name: "Swahili".into(),
            price_per_session: self.price,
            currency: "USD".into(),
        };
        let slot = AvailabilitySlot {
            id: Uuid::new_v4(),
            teacher_id: teacher.id,
            language_id: language.id,
            start_time: self.slot_start,
            end_time: self.slot_start + self.slot_length,
            max_students: self.slot_capacity,
            current_students: 0,
            status: SlotStatus::Available,
        };
        let bundle = Bundle {
            id: Uuid::new_v4(),
            name: "Starter pack".into(),
            language_id: language.id,
            number_of_classes: 5,
            price: Decimal::new(6000, 2),
            currency: "USD".into(),
            is_active: true,
        };

        {
            let (student, teacher, admin) = (student.clone(), teacher.clone(), admin.clone());
            let (language, slot, bundle) = (language.clone(), slot.clone(), bundle.clone());
            db.transaction(move |tx| {
                users::insert_user(tx, &student)?;
                users::insert_user(tx, &teacher)?;
                users::insert_teacher_account(
                    tx,
                    &TeacherAccount {
                        user_id: teacher.id,
                        current_balance: Decimal::ZERO,
                    },
                )?;
                users::insert_user(tx, &admin)?;
                languages::insert_language(tx, &language)?;
                slots::insert_slot(tx, &slot)?;
                bundles::insert_bundle(tx, &bundle)?;
                Ok(())
            })
            .await?;
        }

        let mut config = TutorlaneConfig::default();
        config.storage.database_path = db_path;

        Ok(TestHarness {
            db,
            config,
            student,
            teacher,
            admin,
            language,
            slot,
            bundle,
            mpesa: Arc::new(MockGateway::new(PaymentProvider::Mpesa)),
            paypal: Arc::new(MockGateway::new(PaymentProvider::Paypal)),
            rates: Arc::new(FixedRates::new().with("KES", self.kes_rate)),
            notifier: Arc::new(RecordingNotifier::new()),
            _temp_dir: temp_dir,
        })
    }
}

fn person(name: &str, role: Role, credit: Decimal) -> User {
    let id = Uuid::new_v4();
    User {
        id,
        name: name.to_string(),
        email: format!("{role}-{id}@example.com"),
        role,
        credit_balance: credit,
    }
}

/// A seeded ledger plus mock collaborators. The temp directory lives as
/// long as the harness.
pub struct TestHarness {
    pub db: Arc<Database>,
    /// Defaults, with `storage.database_path` pointing at the temp ledger.
    pub config: TutorlaneConfig,
    pub student: User,
    pub teacher: User,
    pub admin: User,
    pub language: Language,
    pub slot: AvailabilitySlot,
    pub bundle: Bundle,
    pub mpesa: Arc<MockGateway>,
    pub paypal: Arc<MockGateway>,
    pub rates: Arc<FixedRates>,
    pub notifier: Arc<RecordingNotifier>,
    _temp_dir: TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn student(&self) -> Principal {
        Principal::new(self.student.id, Role::Student)
    }

    pub fn teacher(&self) -> Principal {
        Principal::new(self.teacher.id, Role::Teacher)
    }

    pub fn admin(&self) -> Principal {
        Principal::new(self.admin.id, Role::Admin)
    }

    /// Seed another student with `credit`.
    pub async fn add_student(&self, credit: Decimal) -> Result<User, TutorError> {
        let user = person("Extra Student", Role::Student, credit);
        let stored = user.clone();
        self.db
            .transaction(move |tx| users::insert_user(tx, &stored))
            .await?;
        Ok(user)
    }

    /// Seed a pending referral of `referred` by `referrer`.
    pub async fn add_referral(&self, referrer: Uuid, referred: Uuid) -> Result<Referral, TutorError> {
        let referral = Referral {
            id: Uuid::new_v4(),
            referrer_id: referrer,
            referred_user_id: referred,
            status: ReferralStatus::Pending,
            reward_amount: Decimal::ZERO,
        };
        let stored = referral.clone();
        self.db
            .transaction(move |tx| referrals::insert_referral(tx, &stored))
            .await?;
        Ok(referral)
    }

    /// Seed another slot of the harness teacher.
    pub async fn add_slot(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        max_students: u32,
    ) -> Result<AvailabilitySlot, TutorError> {
        let slot = AvailabilitySlot {
            id: Uuid::new_v4(),
            teacher_id: self.teacher.id,
            language_id: self.language.id,
            start_time: start,
            end_time: end,
            max_students,
            current_students: 0,
            status: SlotStatus::Available,
        };
        let stored = slot.clone();
        self.db
            .transaction(move |tx| slots::insert_slot(tx, &stored))
            .await?;
        Ok(slot)
    }

    pub async fn user(&self, id: Uuid) -> Result<User, TutorError> {
        self.db
            .read(move |c| users::get_user(c, id))
            .await?
            .ok_or_else(|| TutorError::not_found("user", id))
    }

    pub async fn teacher_balance(&self) -> Result<Decimal, TutorError> {
        let id = self.teacher.id;
        self.db
            .read(move |c| users::get_teacher_account(c, id))
            .await?
            .map(|account| account.current_balance)
            .ok_or_else(|| TutorError::not_found("teacher account", id))
    }

    pub async fn slot(&self, id: Uuid) -> Result<AvailabilitySlot, TutorError> {
        self.db
            .read(move |c| slots::get_slot(c, id))
            .await?
            .ok_or(TutorError::SlotNotFound(id))
    }

    pub async fn booking(&self, id: Uuid) -> Result<Booking, TutorError> {
        self.db
            .read(move |c| bookings::get_booking(c, id))
            .await?
            .ok_or_else(|| TutorError::not_found("booking", id))
    }

    pub async fn payment(&self, id: Uuid) -> Result<Payment, TutorError> {
        self.db
            .read(move |c| payments::get_payment(c, id))
            .await?
            .ok_or_else(|| TutorError::not_found("payment", id))
    }

    /// Number of booking and payment rows in the ledger.
    pub async fn row_counts(&self) -> Result<(i64, i64), TutorError> {
        self.db
            .read(|c| {
                let bookings = c.query_row("SELECT COUNT(*) FROM bookings", [], |r| r.get(0))?;
                let payments = c.query_row("SELECT COUNT(*) FROM payments", [], |r| r.get(0))?;
                Ok((bookings, payments))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn harness_seeds_the_cast() {
        let harness = TestHarness::builder()
            .with_student_credit(dec!(20.00))
            .with_slot_capacity(3)
            .build()
            .await
            .unwrap();

        let student = harness.user(harness.student.id).await.unwrap();
        assert_eq!(student.credit_balance, dec!(20.00));
        let slot = harness.slot(harness.slot.id).await.unwrap();
        assert_eq!(slot.max_students, 3);
        assert_eq!(slot.status, SlotStatus::Available);
        assert_eq!(harness.teacher_balance().await.unwrap(), Decimal::ZERO);
        assert_eq!(harness.row_counts().await.unwrap(), (0, 0));
    }
}
