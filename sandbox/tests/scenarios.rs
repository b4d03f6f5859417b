//! S5 — tenant deny-list enforcement against the real `mlua`-backed engine.

use std::sync::Arc;

use substrate_engine::EngineConfig;
use substrate_error::{ErrorKind, RecoveryStrategy};
use substrate_lua::{apply_limits, LuaEngine};
use substrate_runtime::{ExecutionContext, MemoryAccounter};
use substrate_sandbox::{Limits, TenantManager};

fn build_tenant_context(denied_globals: &[&str]) -> ExecutionContext<LuaEngine> {
    let engine = LuaEngine::new(EngineConfig::default()).unwrap();
    let mut limits = Limits::default();
    for name in denied_globals {
        limits.denied_globals.insert((*name).to_string());
    }
    apply_limits(engine.lua(), &limits).unwrap();
    ExecutionContext::new(engine, Arc::new(MemoryAccounter::new(16 * 1024 * 1024)), 8, RecoveryStrategy::Propagate, 32)
}

#[test]
fn s5_tenant_deny_list_raises_capability() {
    let manager: TenantManager<LuaEngine> = TenantManager::new();
    let mut limits = Limits::default();
    limits.denied_globals.insert("print".to_string());
    manager
        .create("denied-tenant", "Denied", build_tenant_context(&["print"]), limits)
        .unwrap();

    let err = manager
        .with_tenant_mut("denied-tenant", |tenant| tenant.context.execute("print('hello')"))
        .unwrap()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capability);
}

#[test]
fn s5_tenant_without_deny_list_succeeds() {
    let manager: TenantManager<LuaEngine> = TenantManager::new();
    manager
        .create("open-tenant", "Open", build_tenant_context(&[]), Limits::default())
        .unwrap();

    let result = manager
        .with_tenant_mut("open-tenant", |tenant| tenant.context.execute("print('hello'); return 1"))
        .unwrap()
        .unwrap();
    assert_eq!(result, vec![substrate_value::UniversalValue::Int(1)]);
}

#[test]
fn s5_setting_a_global_in_one_tenant_does_not_leak_to_another() {
    let manager: TenantManager<LuaEngine> = TenantManager::new();
    manager
        .create("a", "Tenant A", build_tenant_context(&[]), Limits::default())
        .unwrap();
    manager
        .create("b", "Tenant B", build_tenant_context(&[]), Limits::default())
        .unwrap();

    manager
        .with_tenant_mut("a", |tenant| tenant.context.set_global("shared", substrate_value::UniversalValue::Int(42)))
        .unwrap()
        .unwrap();

    let b_value = manager
        .with_tenant_mut("b", |tenant| tenant.context.get_global("shared"))
        .unwrap()
        .unwrap();
    assert_eq!(b_value, substrate_value::UniversalValue::Nil);
}
