use std::collections::HashMap;

use cucumber::World;
use log::*;
use course_payment_engine::{
    db_types::PaymentTransaction,
    events::EventProducers,
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        simulated_gateway::SimulatedGateway,
    },
    CourseApi,
    OrderCreated,
    PaymentFlowApi,
    PaymentFlowError,
    SqliteDatabase,
};

#[derive(Default, Debug, World)]
pub struct PaymentWorld {
    pub system: Option<PaymentSystem>,
    /// Every order placed in the scenario, in order, keyed by "student/course".
    pub orders: HashMap<String, Vec<OrderCreated>>,
    /// The last payment made for "student/course": (payment id, signature)
    pub payments: HashMap<String, (String, String)>,
    pub last_error: Option<PaymentFlowError>,
}

#[derive(Debug)]
pub struct PaymentSystem {
    pub db_path: String,
    pub gateway: SimulatedGateway,
    pub api: PaymentFlowApi<SqliteDatabase, SimulatedGateway>,
    pub courses: CourseApi<SqliteDatabase>,
}

pub fn pair(student: &str, course: &str) -> String {
    format!("{student}/{course}")
}

impl PaymentWorld {
    pub fn system(&self) -> &PaymentSystem {
        self.system.as_ref().expect("Payment system not initialised")
    }

    pub fn api(&self) -> &PaymentFlowApi<SqliteDatabase, SimulatedGateway> {
        &self.system().api
    }

    pub fn latest_order(&self, student: &str, course: &str) -> OrderCreated {
        self.orders
            .get(&pair(student, course))
            .and_then(|orders| orders.last().cloned())
            .unwrap_or_else(|| panic!("{student} has not ordered {course}"))
    }

    pub fn nth_order(&self, student: &str, course: &str, n: usize) -> OrderCreated {
        self.orders
            .get(&pair(student, course))
            .and_then(|orders| orders.get(n).cloned())
            .unwrap_or_else(|| panic!("{student} did not order {course} {} times", n + 1))
    }

    pub async fn transaction(&self, order: &OrderCreated) -> PaymentTransaction {
        self.api()
            .fetch_transaction(&order.transaction_id)
            .await
            .expect("Error fetching transaction")
            .expect("Transaction does not exist")
    }

    pub fn record_result<T>(&mut self, result: Result<T, PaymentFlowError>) -> Option<T> {
        match result {
            Ok(v) => {
                self.last_error = None;
                Some(v)
            },
            Err(e) => {
                debug!("Step produced error: {e}");
                self.last_error = Some(e);
                None
            },
        }
    }
}

impl PaymentSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let gateway = SimulatedGateway::default();
        let api = PaymentFlowApi::new(db.clone(), gateway.clone(), gateway.verifier(), "INR", EventProducers::default());
        let courses = CourseApi::new(db);
        Self { db_path: url, gateway, api, courses }
    }
}
