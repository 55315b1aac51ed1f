//! Employee events example.
//!
//! Four in-process services wired together through the event bus:
//!
//! - `EmployeeHiringService` hires people and publishes two events
//! - `BenefitsService` and `VolunteerService` react to new hires
//! - `PayrollService` reacts to payroll adjustments (employee + salary)
//!
//! The caller only ever sees the hiring service's client interface.
//!
//! Run with `RUST_LOG=debug cargo run --example employee_events` to watch the
//! tasks move between worker threads.

use std::fmt;
use std::thread;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use service_queue::{
    flush_service_proxy, service_client, Context, HandlerError, QueueError, Service,
    ServiceRegistry,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub const NEW_HIRE_CHANNEL: &str = "com.company.employee.new";
pub const PAYROLL_ADJUSTMENT_CHANNEL: &str = "com.company.employee.payroll";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    name: String,
    id: u32,
}

impl Employee {
    pub fn new(name: impl Into<String>, id: u32) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

impl fmt::Display for Employee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Employee{{ name='{}', id={} }}", self.name, self.id)
    }
}

#[service_client]
pub trait EmployeeHiringServiceClient {
    fn hire_employee(&self, employee: Employee);
}

// ============================================================================
// Services
// ============================================================================

#[derive(Default)]
struct EmployeeHiringService;

impl EmployeeHiringService {
    fn hire_employee(&mut self, ctx: &Context<'_>) -> Result<Value, HandlerError> {
        let employee: Employee = ctx.arg(0)?;
        let salary = 100;
        info!(thread = %current_thread(), "hired '{}'. details: {}", employee.name, employee);

        ctx.send(NEW_HIRE_CHANNEL, &employee)?;
        ctx.send_array(PAYROLL_ADJUSTMENT_CHANNEL, &(employee, salary))?;
        Ok(Value::Null)
    }
}

#[derive(Default)]
struct BenefitsService;

impl BenefitsService {
    fn enroll(&mut self, ctx: &Context<'_>) -> Result<Value, HandlerError> {
        let employee: Employee = ctx.arg(0)?;
        info!(thread = %current_thread(), "enrolled '{}'", employee.name);
        Ok(Value::Null)
    }
}

#[derive(Default)]
struct VolunteerService;

impl VolunteerService {
    fn invite(&mut self, ctx: &Context<'_>) -> Result<Value, HandlerError> {
        let employee: Employee = ctx.arg(0)?;
        info!(
            thread = %current_thread(),
            "invited '{}' to the community outreach program", employee.name
        );
        Ok(Value::Null)
    }
}

#[derive(Default)]
struct PayrollService;

impl PayrollService {
    fn add_employee_to_payroll(&mut self, ctx: &Context<'_>) -> Result<Value, HandlerError> {
        let employee: Employee = ctx.arg(0)?;
        let salary: i32 = ctx.arg(1)?;
        info!(
            thread = %current_thread(),
            "added '{}' with salary {}", employee.name, salary
        );
        Ok(Value::Null)
    }
}

fn current_thread() -> String {
    thread::current().name().unwrap_or("unnamed").to_string()
}

fn main() -> Result<(), QueueError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let registry = ServiceRegistry::new();

    let hiring = registry.register(
        Service::new(EmployeeHiringService)
            .method("hire_employee", EmployeeHiringService::hire_employee),
    )?;
    registry.register(
        Service::new(PayrollService).on_event(
            PAYROLL_ADJUSTMENT_CHANNEL,
            "add_employee_to_payroll",
            PayrollService::add_employee_to_payroll,
        ),
    )?;
    registry.register(
        Service::new(BenefitsService).on_event(NEW_HIRE_CHANNEL, "enroll", BenefitsService::enroll),
    )?;
    registry.register(
        Service::new(VolunteerService).on_event(
            NEW_HIRE_CHANNEL,
            "invite",
            VolunteerService::invite,
        ),
    )?;

    let client: EmployeeHiringServiceClientProxy = hiring.create_proxy();
    client.hire_employee(Employee::new("Rick", 1));

    flush_service_proxy(&client)?;

    // Queues drain in registration order, so the hiring service's events
    // reach the subscribers before they stop.
    for (queue, stats) in registry.stop_all()? {
        info!(queue = %queue, handled = stats.tasks_handled, "final stats");
    }

    Ok(())
}
