//! The employee hiring flow: one hire fans out to benefits, volunteering,
//! and payroll, each running on its own queue.

use serde_json::Value;
use service_queue::{
    flush_service_proxy, service_client, Context, HandlerError, QueueError, Service,
    ServiceRegistry,
};

use crate::support::Employee;

const NEW_HIRE: &str = "com.company.employee.new";
const PAYROLL_ADJUSTMENT: &str = "com.company.employee.payroll";
const STARTING_SALARY: i32 = 100;

#[service_client]
pub trait HiringClient {
    fn hire_employee(&self, employee: Employee);
}

#[service_client]
pub trait RosterClient {
    fn roster(&self) -> Result<Vec<Employee>, QueueError>;
}

#[service_client]
pub trait PayrollClient {
    fn payroll(&self) -> Result<Vec<(Employee, i32)>, QueueError>;
}

#[derive(Default)]
struct Hiring {
    hired: u32,
}

impl Hiring {
    fn hire_employee(&mut self, ctx: &Context<'_>) -> Result<Value, HandlerError> {
        let employee: Employee = ctx.arg(0)?;
        self.hired += 1;
        ctx.send(NEW_HIRE, &employee)?;
        ctx.send_array(PAYROLL_ADJUSTMENT, &(employee, STARTING_SALARY))?;
        Ok(Value::Null)
    }
}

/// Benefits and volunteering both keep a roster of new hires.
#[derive(Default)]
struct Roster {
    members: Vec<Employee>,
}

impl Roster {
    fn add(&mut self, ctx: &Context<'_>) -> Result<Value, HandlerError> {
        self.members.push(ctx.arg(0)?);
        Ok(Value::Null)
    }

    fn roster(&mut self, _ctx: &Context<'_>) -> Result<Value, HandlerError> {
        Ok(serde_json::to_value(&self.members)?)
    }
}

#[derive(Default)]
struct Payroll {
    rows: Vec<(Employee, i32)>,
}

impl Payroll {
    fn add_employee_to_payroll(&mut self, ctx: &Context<'_>) -> Result<Value, HandlerError> {
        self.rows.push((ctx.arg(0)?, ctx.arg(1)?));
        Ok(Value::Null)
    }

    fn payroll(&mut self, _ctx: &Context<'_>) -> Result<Value, HandlerError> {
        Ok(serde_json::to_value(&self.rows)?)
    }
}

struct Company {
    registry: ServiceRegistry,
    hiring: HiringClientProxy,
    benefits: RosterClientProxy,
    volunteers: RosterClientProxy,
    payroll: PayrollClientProxy,
}

fn company() -> Company {
    let registry = ServiceRegistry::new();
    let hiring = registry
        .register(Service::new(Hiring::default()).method("hire_employee", Hiring::hire_employee))
        .unwrap();
    let benefits = registry
        .register(
            Service::new(Roster::default())
                .named("benefits")
                .on_event(NEW_HIRE, "enroll", Roster::add)
                .method("roster", Roster::roster),
        )
        .unwrap();
    let volunteers = registry
        .register(
            Service::new(Roster::default())
                .named("volunteers")
                .on_event(NEW_HIRE, "invite", Roster::add)
                .method("roster", Roster::roster),
        )
        .unwrap();
    let payroll = registry
        .register(
            Service::new(Payroll::default())
                .on_event(
                    PAYROLL_ADJUSTMENT,
                    "add_employee_to_payroll",
                    Payroll::add_employee_to_payroll,
                )
                .method("payroll", Payroll::payroll),
        )
        .unwrap();

    Company {
        hiring: hiring.create_proxy(),
        benefits: benefits.create_proxy(),
        volunteers: volunteers.create_proxy(),
        payroll: payroll.create_proxy(),
        registry,
    }
}

#[test]
fn hiring_fans_out_to_every_department() {
    let company = company();
    let rick = Employee::new("Rick", 1);

    company.hiring.hire_employee(rick.clone());

    // Flushing hiring means its events have been sent; flushing each
    // subscriber then means they have been handled.
    flush_service_proxy(&company.hiring).unwrap();
    flush_service_proxy(&company.benefits).unwrap();
    flush_service_proxy(&company.volunteers).unwrap();
    flush_service_proxy(&company.payroll).unwrap();

    assert_eq!(company.benefits.roster().unwrap(), vec![rick.clone()]);
    assert_eq!(company.volunteers.roster().unwrap(), vec![rick.clone()]);
    assert_eq!(company.payroll.payroll().unwrap(), vec![(rick, STARTING_SALARY)]);

    let stats = company.registry.stop_all().unwrap();
    let hiring = stats.iter().find(|(name, _)| name == "Hiring").unwrap();
    assert_eq!(hiring.1.tasks_handled, 1);
}

#[test]
fn services_run_on_their_own_named_threads() {
    let registry = ServiceRegistry::new();
    let queue = registry
        .register(Service::new(()).named("threads").method("whoami", |_, _ctx| {
            Ok(std::thread::current().name().unwrap_or_default().into())
        }))
        .unwrap();

    let name = queue
        .enqueue_and_wait("whoami", service_queue::Args::empty())
        .unwrap();
    assert_eq!(name, Value::from("threads"));
    registry.stop_all().unwrap();
}

#[test]
fn many_hires_keep_order_per_department() {
    let company = company();
    let hires: Vec<Employee> = (1..=20)
        .map(|id| Employee::new(&format!("employee-{id}"), id))
        .collect();

    for employee in &hires {
        company.hiring.hire_employee(employee.clone());
    }
    flush_service_proxy(&company.hiring).unwrap();
    company.registry.flush_all().unwrap();

    assert_eq!(company.benefits.roster().unwrap(), hires);
    assert_eq!(company.volunteers.roster().unwrap(), hires);
    let salaries: Vec<i32> = company
        .payroll
        .payroll()
        .unwrap()
        .into_iter()
        .map(|(_, salary)| salary)
        .collect();
    assert_eq!(salaries, vec![STARTING_SALARY; 20]);
    company.registry.stop_all().unwrap();
}
