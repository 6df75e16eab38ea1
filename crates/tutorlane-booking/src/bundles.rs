// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bundle purchase. Same payment choreography as seat allocation, without a
//! slot to lock.

use tracing::{info, instrument};
use uuid::Uuid;

use tutorlane_core::{
    BundleStatus, DomainEvent, Payment, PaymentTarget, Principal, Role, StudentBundle, TutorError,
};
use tutorlane_storage::queries::{bundles, outbox, payments, users};

use crate::engine::BookingEngine;
use crate::intent::{NextStep, PaymentIntent};

#[derive(Debug, Clone, PartialEq)]
pub struct BundlePurchase {
    pub student_bundle: StudentBundle,
    pub payment: Payment,
    pub next_step: NextStep,
}

impl BookingEngine {
    #[instrument(skip(self, intent), fields(student_id = %principal.user_id, provider = %intent.provider()))]
    pub async fn purchase_bundle(
        &self,
        principal: &Principal,
        bundle_id: Uuid,
        intent: PaymentIntent,
    ) -> Result<BundlePurchase, TutorError> {
        principal.require(Role::Student)?;
        intent.validate()?;

        let bundle = self
            .db
            .read(move |c| bundles::get_bundle(c, bundle_id))
            .await?
            .ok_or_else(|| TutorError::not_found("bundle", bundle_id))?;
        if !bundle.is_active {
            return Err(TutorError::InvalidInput(format!(
                "bundle {} is no longer on sale",
                bundle.name
            )));
        }
        let (amount, currency) = self.quote(&intent, bundle.price, &bundle.currency).await?;

        let student_id = principal.user_id;
        let provider = intent.provider();
        let settles = intent.settles_immediately();
        let payment_status = intent.initial_status();

        let (student_bundle, payment) = self
            .db
            .transaction(move |tx| {
                let student_bundle = StudentBundle {
                    id: Uuid::new_v4(),
                    student_id,
                    bundle_id: bundle.id,
                    remaining_classes: bundle.number_of_classes,
                    status: if settles {
                        BundleStatus::Active
                    } else {
                        BundleStatus::PendingPayment
                    },
                };
                bundles::insert_student_bundle(tx, &student_bundle)?;

                if settles {
                    users::adjust_credit(tx, student_id, -amount)?;
                }

                let payment = Payment {
                    id: Uuid::new_v4(),
                    target: PaymentTarget::StudentBundle(student_bundle.id),
                    amount,
                    currency,
                    provider,
                    status: payment_status,
                    refund_status: None,
                    refund_reason: None,
                    provider_order_id: None,
                    merchant_request_id: None,
                    provider_txn_id: None,
                };
                payments::insert_payment(tx, &payment)?;

                if settles {
                    outbox::enqueue(
                        tx,
                        &DomainEvent::BundleActivated {
                            student_bundle_id: student_bundle.id,
                        },
                    )?;
                }
                Ok((student_bundle, payment))
            })
            .await?;

        info!(
            student_bundle_id = %student_bundle.id,
            payment_id = %payment.id,
            status = %student_bundle.status,
            "bundle purchased"
        );

        let next_step = self.open_external_charge(&payment, &intent).await?;
        Ok(BundlePurchase {
            student_bundle,
            payment,
            next_step,
        })
    }
}
